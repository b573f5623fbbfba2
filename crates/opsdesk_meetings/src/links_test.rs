use crate::links::LinkBuilder;
use crate::test_support::{at, meeting};

#[test]
fn test_action_links_use_base_url_without_double_slash() {
    let links = LinkBuilder::new("https://book.example.com/");
    let m = meeting("m1", at(2025, 6, 3, 10, 0), 30);

    let actions = links.action_links(&m.tokens);
    assert_eq!(actions.view_url, "https://book.example.com/meetings/view?token=m1-view");
    assert_eq!(actions.cancel_url, "https://book.example.com/meetings/cancel?token=m1-cancel");
    assert_eq!(
        actions.reschedule_url,
        "https://book.example.com/meetings/reschedule?token=m1-reschedule"
    );
}

#[test]
fn test_tokens_are_query_encoded() {
    let links = LinkBuilder::new("http://localhost:8086");
    let mut m = meeting("m1", at(2025, 6, 3, 10, 0), 30);
    m.tokens.view.token = "a+b/c=".to_string();

    let actions = links.action_links(&m.tokens);
    assert_eq!(actions.view_url, "http://localhost:8086/meetings/view?token=a%2Bb%2Fc%3D");
}

#[test]
fn test_calendar_links_carry_times_and_subject() {
    let links = LinkBuilder::new("https://book.example.com");
    let m = meeting("m1", at(2025, 6, 3, 10, 0), 30);

    let calendar = links.calendar_links(&m);
    assert!(calendar
        .google
        .starts_with("https://calendar.google.com/calendar/render?action=TEMPLATE&text=Intro&"));
    assert!(calendar.google.contains("dates=20250603T100000Z%2F20250603T103000Z"));
    assert!(calendar.google.contains("ctz=UTC"));
    assert!(calendar
        .outlook
        .starts_with("https://outlook.live.com/calendar/0/deeplink/compose?"));
    assert!(calendar.outlook.contains("subject=Intro"));
    assert!(calendar.outlook.contains("startdt=2025-06-03T10%3A00%3A00%2B00%3A00"));
    // Details link back to the view page.
    assert!(calendar.google.contains("meetings%2Fview%3Ftoken%3Dm1-view"));
}
