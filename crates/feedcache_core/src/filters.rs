/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Keyword filters applied to timeline views.

use crate::views::{StatusView, TimelineItem};
use feedcache_entities::{Filter, FilterAction, FilterContext, Status};
use regex::{Regex, RegexBuilder};
use tracing::warn;

struct CompiledFilter<'a> {
    filter: &'a Filter,
    pattern: Regex,
}

fn compile(filter: &Filter) -> Option<Regex> {
    let phrase = filter.phrase.trim();
    if phrase.is_empty() {
        return None;
    }
    let escaped = regex::escape(phrase);
    let word = |c: Option<char>| c.map(|c| c.is_alphanumeric() || c == '_').unwrap_or(false);
    let pattern = if filter.whole_word {
        let head = if word(phrase.chars().next()) { r"\b" } else { "" };
        let tail = if word(phrase.chars().last()) { r"\b" } else { "" };
        format!("{head}{escaped}{tail}")
    } else {
        escaped
    };
    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(filter_id = %filter.id, "filter phrase rejected: {e}");
            None
        }
    }
}

/// Plain text a filter phrase is matched against: content without markup, the content
/// warning and poll options.
fn searchable_text(status: &Status) -> String {
    let body = &status.body;
    let mut text = strip_markup(&body.content);
    if !body.spoiler_text.is_empty() {
        text.push('\n');
        text.push_str(&body.spoiler_text);
    }
    if let Some(poll) = &body.poll {
        for option in &poll.options {
            text.push('\n');
            text.push_str(&option.title);
        }
    }
    text
}

fn strip_markup(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                // Block boundaries must not glue two words together.
                out.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    // Non-breaking spaces count as spaces so multi-word phrases still match.
    html_escape::decode_html_entities(&out).replace('\u{a0}', " ")
}

/// Applies the filters relevant to `context`. Matches of a `hide` filter disappear from
/// the result; matches of a `warn` filter stay, carrying the matched phrases. Without a
/// context the items pass through untouched.
pub fn apply(
    items: Vec<TimelineItem>,
    filters: &[Filter],
    context: Option<FilterContext>,
) -> Vec<TimelineItem> {
    let Some(context) = context else {
        return items;
    };
    let compiled: Vec<CompiledFilter<'_>> = filters
        .iter()
        .filter(|f| f.context.contains(&context))
        .filter_map(|filter| compile(filter).map(|pattern| CompiledFilter { filter, pattern }))
        .collect();
    if compiled.is_empty() {
        return items;
    }

    items
        .into_iter()
        .filter_map(|item| match item {
            TimelineItem::Status(view) => mark(view, &compiled).map(TimelineItem::Status),
            other => Some(other),
        })
        .collect()
}

fn mark(mut view: StatusView, compiled: &[CompiledFilter<'_>]) -> Option<StatusView> {
    let text = searchable_text(view.status.displayed());
    for c in compiled {
        if !c.pattern.is_match(&text) {
            continue;
        }
        match c.filter.action {
            FilterAction::Hide => return None,
            FilterAction::Warn => view.filtered.push(c.filter.phrase.clone()),
        }
    }
    Some(view)
}
