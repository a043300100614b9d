//! Per-job timestamps substituted into output templates, so a re-run of the
//! same link does not overwrite an earlier file with the same title.

use std::collections::HashSet;

use chrono::{DateTime, Local};

use crate::job::STAMP_PLACEHOLDER;

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";

/// Produces stamps that are distinct within one run, even when two jobs
/// start within the same millisecond or the clock steps backwards.
#[derive(Debug, Default)]
pub struct Stamper {
    issued: HashSet<String>,
}

impl Stamper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_stamp(&mut self) -> String {
        self.stamp_at(Local::now())
    }

    pub fn stamp_at(&mut self, now: DateTime<Local>) -> String {
        let base = now.format(STAMP_FORMAT).to_string();
        let mut stamp = base.clone();
        let mut repeats = 0u32;
        while self.issued.contains(&stamp) {
            repeats += 1;
            stamp = format!("{base}-{repeats}");
        }
        self.issued.insert(stamp.clone());
        stamp
    }
}

/// Insert `stamp` into an output template.
///
/// `{timestamp}` is replaced when present. Otherwise `_<stamp>` goes before
/// the extension of the last path component (`%(title)s.%(ext)s` becomes
/// `%(title)s_<stamp>.%(ext)s`), or at the end when there is none.
pub fn stamp_template(template: &str, stamp: &str) -> String {
    if template.contains(STAMP_PLACEHOLDER) {
        return template.replace(STAMP_PLACEHOLDER, stamp);
    }
    let name_start = template
        .rfind(|c: char| c == '/' || c == '\\')
        .map(|i| i + 1)
        .unwrap_or(0);
    match template[name_start..].rfind('.') {
        Some(dot) if dot > 0 => {
            let at = name_start + dot;
            format!("{}_{}{}", &template[..at], stamp, &template[at..])
        }
        _ => format!("{template}_{stamp}"),
    }
}
