use pird::{HelperMessage, MessageOutcome, TriggerMode, apply_message};

fn run(trigger: TriggerMode, lines: &[&str]) -> Vec<MessageOutcome> {
    let mut ready = true;
    lines
        .iter()
        .map(|line| apply_message(HelperMessage::parse(line), trigger, &mut ready))
        .collect()
}

fn detections(outcomes: &[MessageOutcome]) -> usize {
    outcomes
        .iter()
        .filter(|o| **o == MessageOutcome::Detected)
        .count()
}

#[test]
fn edge_mode_suppresses_motion_until_no_motion() {
    let outcomes = run(
        TriggerMode::LowToHighEdge,
        &["Motion", "Motion", "NoMotion", "Motion"],
    );
    assert_eq!(
        outcomes,
        vec![
            MessageOutcome::Detected,
            MessageOutcome::Suppressed,
            MessageOutcome::Rearmed,
            MessageOutcome::Detected,
        ]
    );
    assert_eq!(detections(&outcomes), 2);
}

#[test]
fn level_mode_detects_every_motion() {
    let outcomes = run(
        TriggerMode::LevelHigh,
        &["Motion", "Motion", "NoMotion", "Motion"],
    );
    assert_eq!(detections(&outcomes), 3);
}

#[test]
fn no_motion_rearms_without_detecting() {
    let mut ready = false;
    let outcome = apply_message(HelperMessage::NoMotion, TriggerMode::LowToHighEdge, &mut ready);
    assert_eq!(outcome, MessageOutcome::Rearmed);
    assert!(ready);
}

#[test]
fn tokens_are_matched_exactly() {
    assert_eq!(HelperMessage::parse("Motion"), HelperMessage::Motion);
    assert_eq!(HelperMessage::parse("NoMotion"), HelperMessage::NoMotion);
    assert_eq!(
        HelperMessage::parse("motion"),
        HelperMessage::Unrecognized("motion".into())
    );
    assert_eq!(
        HelperMessage::parse("Motion "),
        HelperMessage::Unrecognized("Motion ".into())
    );
    assert_eq!(
        HelperMessage::parse(""),
        HelperMessage::Unrecognized(String::new())
    );
}

#[test]
fn unrecognized_message_is_a_violation() {
    let mut ready = true;
    let outcome = apply_message(
        HelperMessage::parse("Traceback (most recent call last):"),
        TriggerMode::LowToHighEdge,
        &mut ready,
    );
    assert_eq!(
        outcome,
        MessageOutcome::Violation("Traceback (most recent call last):".into())
    );
    assert!(ready);
}
