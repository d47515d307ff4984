//! Quoted-dialogue removal

use regex::Regex;
use std::sync::LazyLock;

/// Straight or curly double quotes around the shortest run of text, across lines
static DIALOGUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)[“"](.+?)[”"]"#).expect("dialogue pattern is valid"));

/// Strip every quoted passage, quotation marks included
pub fn remove_dialogue(text: &str) -> String {
    DIALOGUE.replace_all(text, "").into_owned()
}
