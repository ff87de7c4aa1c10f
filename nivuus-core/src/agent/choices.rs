//! Detect a numbered option list in an assistant reply

use once_cell::sync::Lazy;
use regex::Regex;

static NUMBERED_LINE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^\d+\.\s*(?P<choice>.*)$").ok());

/// Return the options of the last contiguous run of `N. text` lines.
///
/// Blank lines are ignored; any other unnumbered line ends the current run.
/// Fewer than two options is not a choice list.
pub fn parse_numbered_choices(text: &str) -> Option<Vec<String>> {
    let pattern = NUMBERED_LINE.as_ref()?;

    let mut best: Vec<String> = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match pattern.captures(line) {
            Some(caps) => {
                let choice = caps.name("choice").map_or("", |m| m.as_str()).trim();
                current.push(choice.to_string());
            }
            None if !current.is_empty() => best = std::mem::take(&mut current),
            None => {}
        }
    }
    if !current.is_empty() {
        best = current;
    }

    (best.len() >= 2).then_some(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_list_is_detected() {
        let text = "I can do several things:\n1. Check disk usage\n2. List running services\n3. Show the kernel version";
        assert_eq!(
            parse_numbered_choices(text),
            Some(vec![
                "Check disk usage".to_string(),
                "List running services".to_string(),
                "Show the kernel version".to_string(),
            ])
        );
    }

    #[test]
    fn only_the_last_run_counts() {
        let text = "Findings:\n1. Disk is 90% full\n2. Swap is off\n\nNext steps:\n1. Clean /tmp\n2. Enable swap";
        assert_eq!(
            parse_numbered_choices(text),
            Some(vec!["Clean /tmp".to_string(), "Enable swap".to_string()])
        );
    }

    #[test]
    fn blank_lines_do_not_break_a_run() {
        let text = "1. First\n\n2. Second";
        assert_eq!(
            parse_numbered_choices(text),
            Some(vec!["First".to_string(), "Second".to_string()])
        );
    }

    #[test]
    fn closing_question_keeps_the_preceding_run() {
        let text = "1. Yes\n2. No\nWhich do you prefer?";
        assert_eq!(
            parse_numbered_choices(text),
            Some(vec!["Yes".to_string(), "No".to_string()])
        );
    }

    #[test]
    fn single_item_or_prose_is_not_a_choice() {
        assert_eq!(parse_numbered_choices("1. Only one option"), None);
        assert_eq!(parse_numbered_choices("No list here."), None);
        assert_eq!(parse_numbered_choices(""), None);
    }

    #[test]
    fn interrupted_run_keeps_the_later_part() {
        let text = "1. a\n2. b\nnote\n3. c";
        assert_eq!(parse_numbered_choices(text), None);
    }
}
