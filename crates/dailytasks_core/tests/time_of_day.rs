use dailytasks_core::{TimeFormatError, TimeOfDay};

#[test]
fn every_minute_of_the_day_roundtrips_through_24h_text() {
    for minutes in 0..24 * 60 {
        let time = TimeOfDay::from_minutes(minutes).unwrap();
        assert_eq!(TimeOfDay::parse(&time.format_24h()).unwrap(), time);
    }
}

#[test]
fn twelve_hour_labels_match_clock_conventions() {
    let cases = [
        ("00:05", "12:05 AM"),
        ("13:30", "1:30 PM"),
        ("12:00", "12:00 PM"),
        ("09:00", "9:00 AM"),
        ("23:59", "11:59 PM"),
    ];
    for (input, expected) in cases {
        assert_eq!(TimeOfDay::parse(input).unwrap().format_12h(), expected);
    }
}

#[test]
fn malformed_text_is_a_format_error() {
    for input in ["", "9", "9:5", "09-00", "noon", "09:00:00", "1:300"] {
        assert!(
            matches!(TimeOfDay::parse(input), Err(TimeFormatError::Malformed(_))),
            "`{input}` should be malformed"
        );
    }
}

#[test]
fn out_of_range_components_are_rejected() {
    assert_eq!(
        TimeOfDay::parse("24:00"),
        Err(TimeFormatError::HourOutOfRange(24))
    );
    assert_eq!(
        TimeOfDay::parse("07:60"),
        Err(TimeFormatError::MinuteOutOfRange(60))
    );
}

#[test]
fn serde_uses_24h_text() {
    let time = TimeOfDay::parse("7:45").unwrap();
    let json = serde_json::to_string(&time).unwrap();
    assert_eq!(json, "\"07:45\"");

    let decoded: TimeOfDay = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, time);
    assert!(serde_json::from_str::<TimeOfDay>("\"25:00\"").is_err());
}
