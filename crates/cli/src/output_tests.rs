use super::*;

#[test]
fn truncate_keeps_short_strings() {
    assert_eq!(truncate("job-1", 12), "job-1");
}

#[test]
fn truncate_cuts_on_char_boundaries() {
    assert_eq!(truncate("0123456789abcdef", 12), "0123456789ab");
    assert_eq!(truncate("größenwahn", 4), "größ");
}
