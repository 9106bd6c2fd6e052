//! Fragment planner: turns text into an ordered list of voice-bound fragments.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::error::{Error, Result};
use crate::manifest::Fragment;
use crate::voice::Voice;

static DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ZVOX:\s*(\S+)").expect("valid regex"));

/// Returns the voice name if `line` is an inline voice directive
/// (`ZVOX: <name>`). Directive lines never appear in output.
pub fn match_voice(line: &str) -> Option<&str> {
    DIRECTIVE_RE
        .captures(line)
        .map(|caps| caps.get(1).expect("one capture group").as_str())
}

/// Parses text into fragments, line by line, honoring inline voice
/// directives and an optional per-fragment character budget.
///
/// A current bound voice starts at `voice` and switches when a directive
/// names a resolvable entry in `voices`; an unresolvable name is dropped with
/// the binding unchanged. A non-empty line with no bound voice is a fatal
/// input error. Under `max_chars`, consecutive same-voice lines accumulate
/// into one fragment joined by newlines; a blank line that does not
/// accumulate becomes an empty fragment marking a paragraph break.
///
/// Output order is strictly input line order, and identical inputs always
/// yield identical fragments.
pub fn parse_text(
    text: &str,
    voice: Option<&Voice>,
    voices: &BTreeMap<String, Option<Voice>>,
    max_chars: Option<usize>,
) -> Result<Vec<Fragment>> {
    let mut fragments: Vec<Fragment> = Vec::new();
    let mut line_voice: Option<Voice> = voice.cloned();
    let mut line_voice_name: Option<String> = None;

    for line in text.split('\n') {
        if let Some(name) = match_voice(line) {
            match voices.get(name) {
                Some(Some(named)) => {
                    line_voice = Some(named.clone());
                    line_voice_name = Some(name.to_string());
                }
                // Preserved no-op: the directive line is dropped and the
                // prior binding stays in effect.
                _ => warn!(name, "inline voice directive names an unknown voice"),
            }
            continue;
        }

        if !line.is_empty() && line_voice.is_none() {
            return Err(Error::input("no voice specified for text fragment"));
        }

        if let (Some(max), Some(last)) = (max_chars, fragments.last_mut()) {
            let within_budget =
                last.text.chars().count() + 1 + line.chars().count() <= max;
            let same_voice =
                last.voice == line_voice && last.voice_name == line_voice_name;
            if !last.text.is_empty() && within_budget && same_voice {
                if !line.is_empty() && last.text.ends_with("\n\n") {
                    // Two blank-line joins in a row: keep the paragraph-break
                    // silence marker explicit instead of folding it away.
                    fragments.push(Fragment::silence(None));
                } else {
                    last.text.push('\n');
                    last.text.push_str(line);
                    continue;
                }
            }
        }

        if line.is_empty() {
            fragments.push(Fragment::silence(None));
        } else {
            fragments.push(Fragment::new(
                line,
                line_voice.clone(),
                line_voice_name.clone(),
            ));
        }
    }
    Ok(fragments)
}
