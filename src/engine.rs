//! Run-aware placeholder substitution.
//!
//! Placeholders are matched against the concatenated text of a paragraph-like
//! container, so a token may be scattered over any number of runs (Word
//! splits text at every spell-check, revision or formatting boundary). Each
//! occurrence is spliced out of the run list and the replacement is carried by
//! the run in which the token started; text around the token keeps the
//! formatting of the run it came from.

use std::ops::Range;

use crate::docx::{StyleKind, StyleSnapshot};
use crate::error::Error;
use crate::model::Run;
use crate::replacements::ReplacementMap;

/// A paragraph-like unit exposing an ordered run sequence.
pub trait RichTextContainer {
    fn runs(&self) -> &[Run];

    /// Swap the whole run list for a rebuilt one.
    fn replace_runs(&mut self, runs: Vec<Run>);

    fn text(&self) -> String {
        self.runs().iter().map(|r| r.text.as_str()).collect()
    }
}

impl RichTextContainer for Vec<Run> {
    fn runs(&self) -> &[Run] {
        self
    }

    fn replace_runs(&mut self, runs: Vec<Run>) {
        *self = runs;
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubstitutionReport {
    /// Number of placeholder occurrences replaced.
    pub replaced: usize,
    /// Runs whose character style reference was rebound to a snapshot entry.
    pub styles_rebound: usize,
}

impl SubstitutionReport {
    pub fn changed(&self) -> bool {
        self.replaced > 0
    }
}

/// Replace every placeholder of `replacements` in `container`.
///
/// Keys are handled in map order. Text inserted for one key is never searched
/// again, neither for the same key nor for later ones. A container without
/// any placeholder is left untouched.
pub fn substitute<C>(
    container: &mut C,
    replacements: &ReplacementMap,
    styles: &StyleSnapshot,
) -> Result<SubstitutionReport, Error>
where
    C: RichTextContainer + ?Sized,
{
    let original: Vec<Run> = container
        .runs()
        .iter()
        .enumerate()
        .map(|(i, r)| Run {
            origin: Some(i),
            ..r.clone()
        })
        .collect();
    let mut runs = original.clone();
    let mut text = concat(&runs);
    let mut inserted: Vec<Range<usize>> = Vec::new();
    let mut report = SubstitutionReport::default();

    for (key, value) in replacements.iter() {
        if key.is_empty() || !text.contains(key) {
            continue;
        }
        let mut from = 0;
        while let Some(start) = find_fresh(&text, key, from, &inserted) {
            log::info!("Found placeholder {key} in paragraph, replacing with {value}");
            splice_occurrence(&mut runs, start..start + key.len(), value)?;
            text.replace_range(start..start + key.len(), value);

            let end = start + key.len();
            let delta = value.len() as isize - key.len() as isize;
            for r in inserted.iter_mut().filter(|r| r.start >= end) {
                r.start = (r.start as isize + delta) as usize;
                r.end = (r.end as isize + delta) as usize;
            }
            inserted.push(start..start + value.len());

            let rebuilt = concat(&runs);
            if rebuilt != text {
                return Err(Error::ContainerConsistency(format!(
                    "expected {text:?}, runs read {rebuilt:?}"
                )));
            }
            report.replaced += 1;
            from = start + value.len();
        }
    }

    if report.changed() {
        report.styles_rebound = reassert_styles(&mut runs, &original, styles);
        container.replace_runs(runs);
    }
    Ok(report)
}

fn concat(runs: &[Run]) -> String {
    runs.iter().map(|r| r.text.as_str()).collect()
}

/// Next occurrence of `key` at or after `from` that does not touch text
/// inserted by an earlier replacement.
fn find_fresh(text: &str, key: &str, mut from: usize, inserted: &[Range<usize>]) -> Option<usize> {
    while from <= text.len() {
        let start = from + text[from..].find(key)?;
        let end = start + key.len();
        if !inserted.iter().any(|r| r.start < end && start < r.end) {
            return Some(start);
        }
        let step = text[start..].chars().next().map_or(1, char::len_utf8);
        from = start + step;
    }
    None
}

/// Locate the run holding byte `offset` of the concatenated text and the
/// offset inside it. With `inclusive_end` the position just past a run's last
/// byte still belongs to that run.
fn locate(runs: &[Run], offset: usize, inclusive_end: bool) -> Option<(usize, usize)> {
    let mut pos = 0;
    for (i, run) in runs.iter().enumerate() {
        let len = run.text.len();
        let inside = if inclusive_end {
            offset > pos && offset <= pos + len
        } else {
            offset >= pos && offset < pos + len
        };
        if inside {
            return Some((i, offset - pos));
        }
        pos += len;
    }
    None
}

fn splice_occurrence(runs: &mut Vec<Run>, span: Range<usize>, value: &str) -> Result<(), Error> {
    let out_of_range = || {
        Error::ContainerConsistency(format!("occurrence {span:?} is outside the run list"))
    };
    let (first, start_in) = locate(runs, span.start, false).ok_or_else(out_of_range)?;
    let (last, end_in) = locate(runs, span.end, true).ok_or_else(out_of_range)?;

    let mut fragments = Vec::with_capacity(2);
    if first == last {
        let run = &runs[first];
        let text = format!("{}{}{}", &run.text[..start_in], value, &run.text[end_in..]);
        if !text.is_empty() {
            fragments.push(run.fragment(text));
        }
    } else {
        let head = &runs[first];
        let text = format!("{}{}", &head.text[..start_in], value);
        if !text.is_empty() {
            fragments.push(head.fragment(text));
        }
        let tail = &runs[last];
        let suffix = &tail.text[end_in..];
        if !suffix.is_empty() {
            fragments.push(tail.fragment(suffix.to_string()));
        }
    }

    log::debug!(
        "Spliced runs {first}..={last} into {} fragment(s)",
        fragments.len()
    );
    runs.splice(first..=last, fragments);
    Ok(())
}

/// Write back the font name and size each run had before the rebuild and
/// rebind character style references to the document's own style ids. Only
/// character styles are valid targets for `w:rStyle`.
fn reassert_styles(runs: &mut [Run], original: &[Run], styles: &StyleSnapshot) -> usize {
    let mut rebound = 0;
    for run in runs.iter_mut() {
        if let Some(source) = run.origin.and_then(|i| original.get(i)) {
            if let Some(name) = source.properties.font_name()
                && run.properties.font_name() != Some(name)
            {
                run.properties.set_font_name(name);
            }
            if source.properties.size.is_some() && run.properties.size.is_none() {
                run.properties.size = source.properties.size;
            }
        }
        let Some(reference) = run.properties.style.as_deref() else {
            continue;
        };
        if let Some(def) = styles.resolve(reference)
            && def.kind == StyleKind::Character
            && def.id != reference
        {
            log::debug!("Rebinding run style {reference:?} to {:?}", def.id);
            run.properties.style = Some(def.id.clone());
            rebound += 1;
        }
    }
    rebound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunProperties;

    fn texts(runs: &[Run]) -> Vec<&str> {
        runs.iter().map(|r| r.text.as_str()).collect()
    }

    fn sized(text: &str, half_points: u32) -> Run {
        Run::styled(
            text,
            RunProperties {
                size: Some(half_points),
                ..Default::default()
            },
        )
    }

    fn map(pairs: &[(&str, &str)]) -> ReplacementMap {
        ReplacementMap::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn token_inside_one_run() {
        let mut runs = vec![Run::new("Prod"), Run::new("uct$X$ end")];
        let report = substitute(&mut runs, &map(&[("$X$", "42")]), &StyleSnapshot::default()).unwrap();
        assert_eq!(report.replaced, 1);
        assert_eq!(texts(&runs), ["Prod", "uct42 end"]);
    }

    #[test]
    fn token_spanning_three_runs() {
        let mut runs = vec![sized("a$", 20), sized("X", 22), sized("$b", 24)];
        substitute(&mut runs, &map(&[("$X$", "value")]), &StyleSnapshot::default()).unwrap();
        assert_eq!(texts(&runs), ["avalue", "b"]);
        assert_eq!(runs[0].properties.size, Some(20));
        assert_eq!(runs[1].properties.size, Some(24));
        assert_eq!(runs[0].origin(), Some(0));
        assert_eq!(runs[1].origin(), Some(2));
    }

    #[test]
    fn token_split_on_run_boundaries() {
        let mut runs = vec![Run::new("x"), Run::new("$X$"), Run::new("y")];
        substitute(&mut runs, &map(&[("$X$", "1")]), &StyleSnapshot::default()).unwrap();
        assert_eq!(texts(&runs), ["x", "1", "y"]);
    }

    #[test]
    fn empty_fragments_are_dropped() {
        let mut runs = vec![Run::new("$X"), Run::new("$")];
        substitute(&mut runs, &map(&[("$X$", "")]), &StyleSnapshot::default()).unwrap();
        assert!(runs.is_empty());
    }

    #[test]
    fn repeated_occurrences_are_all_replaced() {
        let mut runs = vec![Run::new("$A$ and $"), Run::new("A$!")];
        let report = substitute(&mut runs, &map(&[("$A$", "1")]), &StyleSnapshot::default()).unwrap();
        assert_eq!(report.replaced, 2);
        assert_eq!(runs.text(), "1 and 1!");
    }

    #[test]
    fn inserted_text_is_not_rescanned() {
        let mut runs = vec![Run::new("$A$ $B$")];
        let replacements = map(&[("$A$", "$B$"), ("$B$", "b")]);
        let report = substitute(&mut runs, &replacements, &StyleSnapshot::default()).unwrap();
        assert_eq!(report.replaced, 2);
        assert_eq!(runs.text(), "$B$ b");
    }

    #[test]
    fn value_containing_its_own_key_terminates() {
        let mut runs = vec![Run::new("$A$$A$")];
        substitute(&mut runs, &map(&[("$A$", "[$A$]")]), &StyleSnapshot::default()).unwrap();
        assert_eq!(runs.text(), "[$A$][$A$]");
    }

    #[test]
    fn adjacent_tokens_resolve_independently() {
        let mut runs = vec![Run::new("$A$"), Run::new("$B$")];
        substitute(&mut runs, &map(&[("$B$", "2"), ("$A$", "1")]), &StyleSnapshot::default())
            .unwrap();
        assert_eq!(texts(&runs), ["1", "2"]);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let mut runs = vec![Run::new("$x$")];
        let report = substitute(&mut runs, &map(&[("$X$", "1")]), &StyleSnapshot::default()).unwrap();
        assert_eq!(report.replaced, 0);
        assert_eq!(runs.text(), "$x$");
    }

    #[test]
    fn untouched_container_keeps_run_identity() {
        let mut runs = vec![sized("no", 20), Run::new(" tokens")];
        let before = runs.clone();
        substitute(&mut runs, &map(&[("$X$", "1")]), &StyleSnapshot::default()).unwrap();
        assert_eq!(runs, before);
    }

    #[test]
    fn multibyte_tokens_split_mid_string() {
        let mut runs = vec![Run::new("名称：$产品"), Run::new("名称$。")];
        substitute(&mut runs, &map(&[("$产品名称$", "FundX")]), &StyleSnapshot::default()).unwrap();
        assert_eq!(texts(&runs), ["名称：FundX", "。"]);
    }

    #[test]
    fn zero_length_runs_inside_a_token_disappear() {
        let mut runs = vec![Run::new("$"), Run::new(""), Run::new("X$"), Run::new("")];
        substitute(&mut runs, &map(&[("$X$", "v")]), &StyleSnapshot::default()).unwrap();
        assert_eq!(texts(&runs), ["v", ""]);
    }

    #[test]
    fn style_references_are_rebound_by_name() {
        let styles = StyleSnapshot::from_definitions([("Emphasis1", "Emphasis")]);
        let mut runs = vec![Run::styled(
            "$X$",
            RunProperties {
                style: Some("Emphasis".into()),
                ..Default::default()
            },
        )];
        let report = substitute(&mut runs, &map(&[("$X$", "1")]), &styles).unwrap();
        assert_eq!(report.styles_rebound, 1);
        assert_eq!(runs[0].properties.style.as_deref(), Some("Emphasis1"));
    }

    #[test]
    fn paragraph_styles_are_never_rebound() {
        let styles = StyleSnapshot::parse(
            r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:styleId="a1"><w:name w:val="Heading"/></w:style></w:styles>"#,
        )
        .unwrap();
        let mut runs = vec![Run::styled(
            "$X$",
            RunProperties {
                style: Some("Heading".into()),
                ..Default::default()
            },
        )];
        let report = substitute(&mut runs, &map(&[("$X$", "1")]), &styles).unwrap();
        assert_eq!(report.styles_rebound, 0);
        assert_eq!(runs[0].properties.style.as_deref(), Some("Heading"));
    }
}
