//! Mode-stack scanning engine
//!
//! The tokenizer walks the input with a cursor and a stack of active modes.
//! Each step finds, among the rules the current mode reacts to, the match
//! closest to the cursor and applies it: a begin match pushes a child mode,
//! an end match pops one or more modes, an illegal match aborts the scan.
//! Text between matches accumulates in a buffer that is flushed through
//! keyword processing, or through a delegate grammar, whenever the active
//! mode changes.
//!
//! ## Design
//!
//! 1. **Per-rule scanning**: every rule the current mode reacts to keeps its
//!    own pattern and a cached leftmost match. A cached match stays valid
//!    until the cursor passes it, so each pattern is searched close to once
//!    per stretch of input.
//! 2. **The buffer is a range**: buffered text is always a contiguous slice
//!    of the input, so the engine tracks byte offsets instead of copying
//!    text around.
//! 3. **Bounded everything**: mode depth, delegation depth, and total steps
//!    are capped. Hitting a cap degrades the output and sets the stream's
//!    `truncated` flag instead of failing the scan.

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

use crate::compile::{CompiledGrammar, CompiledPattern, ModeId};
use crate::keywords::MAX_KEYWORD_HITS;
use crate::registry::GrammarRegistry;
use crate::token::{Emitter, TokenStream};

/// Knobs for a single tokenization run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizeOptions {
    /// Treat illegal matches as plain text instead of failing.
    pub ignore_illegals: bool,
    /// Deepest allowed mode stack; further begins are consumed as text.
    pub max_mode_depth: usize,
    /// Deepest allowed delegation chain; further delegation emits plain text.
    pub max_sublanguage_depth: usize,
    /// Hard cap on scan steps. `None` leaves only the built-in runaway guard.
    pub step_limit: Option<u64>,
}

impl Default for TokenizeOptions {
    fn default() -> Self {
        Self {
            ignore_illegals: false,
            max_mode_depth: 256,
            max_sublanguage_depth: 16,
            step_limit: None,
        }
    }
}

/// Why a tokenization run failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// The active mode's illegal pattern matched: the input is not this
    /// grammar's language.
    GrammarMismatch {
        /// Byte offset of the offending text.
        offset: usize,
        /// The text the illegal pattern matched.
        lexeme: String,
        /// Category of the mode that was active, when it has one.
        category: Option<String>,
    },
    /// No grammar registered under the requested name.
    UnknownGrammar(String),
}

impl fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenizeError::GrammarMismatch {
                offset,
                lexeme,
                category,
            } => write!(
                f,
                "illegal lexeme `{}` at byte {} in `{}`",
                lexeme,
                offset,
                category.as_deref().unwrap_or("<unnamed>")
            ),
            TokenizeError::UnknownGrammar(name) => write!(f, "unknown grammar `{}`", name),
        }
    }
}

impl std::error::Error for TokenizeError {}

/// Tokenize `input` against a compiled grammar. The registry resolves
/// delegate grammars named by `sub_languages` modes.
pub fn tokenize(
    grammar: &CompiledGrammar,
    registry: &GrammarRegistry,
    input: &str,
    options: &TokenizeOptions,
) -> Result<TokenStream, TokenizeError> {
    tokenize_at_depth(grammar, registry, input, options, 0)
}

pub(crate) fn tokenize_at_depth(
    grammar: &CompiledGrammar,
    registry: &GrammarRegistry,
    input: &str,
    options: &TokenizeOptions,
    depth: usize,
) -> Result<TokenStream, TokenizeError> {
    let mut tokenizer = Tokenizer {
        grammar,
        registry,
        input,
        options: options.clone(),
        stack: Vec::new(),
        emitter: Emitter::new(input),
        buffer: 0..0,
        cursor: 0,
        last_match: None,
        relevance: 0,
        keyword_hits: HashMap::new(),
        truncated: false,
        depth,
    };
    tokenizer.run()?;
    Ok(TokenStream::new(
        tokenizer.emitter.finish(),
        tokenizer.relevance,
        tokenizer.truncated,
    ))
}

/// What a winning rule does when it fires.
#[derive(Debug, Clone, Copy)]
enum Action {
    /// Push this child mode.
    Begin(ModeId),
    /// Close modes down to the frame at this stack depth.
    End { owner: usize },
    /// The active mode's illegal pattern.
    Illegal,
}

struct Candidate<'a> {
    pattern: &'a CompiledPattern,
    action: Action,
}

/// One active mode on the stack.
struct Frame<'a> {
    mode: ModeId,
    /// Rules this mode reacts to, in priority order: child begins first,
    /// then the own end, then closable ancestor ends, then illegal.
    candidates: Vec<Candidate<'a>>,
    /// Cached leftmost match per rule; valid while the cursor has not
    /// passed the cached start.
    cache: Vec<Option<Option<(usize, usize)>>>,
    /// Whether this frame opened an emitter scope.
    opened: bool,
}

impl<'a> Frame<'a> {
    fn new(mode: ModeId, candidates: Vec<Candidate<'a>>, opened: bool) -> Self {
        let cache = vec![None; candidates.len()];
        Self {
            mode,
            candidates,
            cache,
            opened,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Winner {
    rule: usize,
    start: usize,
    end: usize,
    action: Action,
}

fn build_candidates<'a>(
    grammar: &'a CompiledGrammar,
    stack: &[Frame<'a>],
    mode_id: ModeId,
) -> Vec<Candidate<'a>> {
    let mode = grammar.mode(mode_id);
    let mut candidates = Vec::with_capacity(mode.children.len() + 2);
    for &child in &mode.children {
        candidates.push(Candidate {
            pattern: &grammar.mode(child).begin,
            action: Action::Begin(child),
        });
    }
    let depth = stack.len();
    if let Some(end) = &mode.end {
        candidates.push(Candidate {
            pattern: end,
            action: Action::End { owner: depth },
        });
    }
    // While a mode ends with its parent, the parent's end can close it too,
    // and so on up the chain.
    let mut level = depth;
    let mut current = mode;
    while current.ends_with_parent && level > 0 {
        level -= 1;
        let ancestor = grammar.mode(stack[level].mode);
        if let Some(end) = &ancestor.end {
            candidates.push(Candidate {
                pattern: end,
                action: Action::End { owner: level },
            });
        }
        current = ancestor;
    }
    if let Some(illegal) = &mode.illegal {
        candidates.push(Candidate {
            pattern: illegal,
            action: Action::Illegal,
        });
    }
    candidates
}

/// Leftmost match at or after `from` among rules `min_rule..`, ties broken
/// by rule order.
fn scan(input: &str, frame: &mut Frame<'_>, from: usize, min_rule: usize) -> Option<Winner> {
    if from > input.len() {
        return None;
    }
    let mut best: Option<Winner> = None;
    for idx in min_rule..frame.candidates.len() {
        let cached_valid = match frame.cache[idx] {
            Some(Some((start, _))) => start >= from,
            Some(None) => true,
            None => false,
        };
        if !cached_valid {
            frame.cache[idx] = Some(frame.candidates[idx].pattern.find_from(input, from));
        }
        let Some(Some((start, end))) = frame.cache[idx] else {
            continue;
        };
        if best.as_ref().map_or(true, |winner| start < winner.start) {
            best = Some(Winner {
                rule: idx,
                start,
                end,
                action: frame.candidates[idx].action,
            });
            if start == from {
                break;
            }
        }
    }
    best
}

/// Next byte offset after `at`. Past the end of input the offset keeps
/// growing, which ends the scan loop instead of spinning on a zero-width
/// match at the boundary.
fn advance_cursor(input: &str, at: usize) -> usize {
    if at >= input.len() {
        return at + 1;
    }
    let mut next = at + 1;
    while !input.is_char_boundary(next) {
        next += 1;
    }
    next
}

struct Tokenizer<'a> {
    grammar: &'a CompiledGrammar,
    registry: &'a GrammarRegistry,
    input: &'a str,
    options: TokenizeOptions,
    stack: Vec<Frame<'a>>,
    emitter: Emitter<'a>,
    /// Text waiting to be flushed; always a contiguous slice ending at the
    /// cursor (or just behind it while a match is being applied).
    buffer: Range<usize>,
    cursor: usize,
    /// Start offset of the previous match and whether it was a begin.
    last_match: Option<(usize, bool)>,
    relevance: u32,
    /// Hit counts per keyword, capping how much one word can score.
    keyword_hits: HashMap<String, u32>,
    truncated: bool,
    /// Current delegation depth; zero for the host language.
    depth: usize,
}

impl<'a> Tokenizer<'a> {
    fn run(&mut self) -> Result<(), TokenizeError> {
        let root = self.grammar.root();
        let candidates = build_candidates(self.grammar, &self.stack, root);
        self.stack.push(Frame::new(root, candidates, false));

        let mut min_rule = 0usize;
        let mut steps: u64 = 0;

        loop {
            steps += 1;
            if self.over_step_limit(steps) {
                self.truncated = true;
                self.buffer.end = self.input.len();
                self.flush_buffer();
                break;
            }

            let top = self.stack.len() - 1;
            let winner = {
                let frame = &mut self.stack[top];
                match scan(self.input, frame, self.cursor, min_rule) {
                    Some(winner) if min_rule == 0 || winner.start == self.cursor => Some(winner),
                    _ if min_rule > 0 => {
                        // A resumed scan only counts when it lands exactly on
                        // the ignored position. Otherwise every rule gets
                        // another chance one character further on.
                        let from = advance_cursor(self.input, self.cursor);
                        scan(self.input, frame, from, 0)
                    }
                    other => other,
                }
            };
            min_rule = 0;

            let Some(winner) = winner else {
                // Nothing matches ahead: the rest of the input belongs to
                // the current mode.
                self.buffer.end = self.input.len();
                self.flush_buffer();
                break;
            };

            debug_assert!(winner.start >= self.buffer.end);
            self.buffer.end = winner.start;
            self.cursor = winner.start;

            // A zero-width end directly after a begin at the same offset
            // would never advance. Swallow one character instead.
            if matches!(winner.action, Action::End { .. })
                && winner.start == winner.end
                && matches!(self.last_match, Some((at, true)) if at == winner.start)
            {
                self.consume_one();
                continue;
            }
            self.last_match = Some((winner.start, matches!(winner.action, Action::Begin(_))));

            match winner.action {
                Action::Begin(child_id) => {
                    let child = self.grammar.mode(child_id);
                    if child.ignore_begin_if_preceded_by_dot
                        && self.input[..winner.start].ends_with('.')
                    {
                        min_rule = self.ignore_match(top, winner.rule);
                        continue;
                    }
                    self.begin_mode(child_id, &winner);
                }
                Action::End { owner } => self.end_modes(owner, &winner),
                Action::Illegal => {
                    if !self.options.ignore_illegals {
                        let mode = self.grammar.mode(self.stack[top].mode);
                        return Err(TokenizeError::GrammarMismatch {
                            offset: winner.start,
                            lexeme: self.input[winner.start..winner.end].to_string(),
                            category: mode.category.clone(),
                        });
                    }
                    if winner.start == winner.end {
                        // Zero-width illegal matches (`$` and friends) have
                        // no text to consume; step over one character.
                        self.consume_one();
                    } else {
                        self.buffer.end = winner.end;
                        self.cursor = winner.end;
                    }
                }
            }
        }
        Ok(())
    }

    fn over_step_limit(&self, steps: u64) -> bool {
        if let Some(limit) = self.options.step_limit {
            if steps > limit {
                return true;
            }
        }
        // Far more steps than consumed input means the scan is spinning. A
        // zero-width begin costs three steps per consumed character, so the
        // ratio leaves linear-progress scans well clear of the guard.
        steps > 100_000 && steps > (self.cursor as u64).saturating_mul(10)
    }

    /// An ignored match resumes the scan at the same spot with the rules
    /// after it, or consumes one character when it was the last rule.
    fn ignore_match(&mut self, top: usize, rule: usize) -> usize {
        let next_rule = rule + 1;
        if next_rule >= self.stack[top].candidates.len() {
            self.consume_one();
            0
        } else {
            next_rule
        }
    }

    /// Move the cursor one character forward, taking the character into the
    /// buffer.
    fn consume_one(&mut self) {
        let next = advance_cursor(self.input, self.cursor);
        self.buffer.end = next.min(self.input.len());
        self.cursor = next;
    }

    fn begin_mode(&mut self, child_id: ModeId, winner: &Winner) {
        if self.stack.len() >= self.options.max_mode_depth {
            // Too deep: the begin text degrades to buffered text of the
            // current mode.
            self.truncated = true;
            self.buffer.end = winner.end;
            self.cursor = winner.end;
            if winner.start == winner.end {
                self.consume_one();
            }
            return;
        }

        let child = self.grammar.mode(child_id);

        if child.exclude_begin {
            // The begin text belongs to the enclosing mode.
            self.buffer.end = winner.end;
            self.flush_buffer();
            self.buffer = winner.end..winner.end;
            self.cursor = winner.end;
        } else {
            self.flush_buffer();
            if child.return_begin {
                // Leave the begin text for the new mode's own rules.
                self.buffer = winner.start..winner.start;
                self.cursor = winner.start;
            } else {
                self.buffer = winner.start..winner.end;
                self.cursor = winner.end;
            }
        }

        let opened = child.category.is_some();
        if let Some(category) = &child.category {
            self.emitter.open(category);
        }

        if let Some(parts) = &child.begin_parts {
            self.emit_begin_parts(child_id, parts, winner);
            self.buffer = winner.end..winner.end;
            self.cursor = winner.end;
        }

        let candidates = build_candidates(self.grammar, &self.stack, child_id);
        self.stack.push(Frame::new(child_id, candidates, opened));
    }

    /// Emit the fragments of a composite begin match. Tagged fragments carry
    /// their own category; untagged ones go through the keyword table of the
    /// mode the match was found in.
    fn emit_begin_parts(
        &mut self,
        child_id: ModeId,
        parts: &[(usize, Option<String>)],
        winner: &Winner,
    ) {
        let child = self.grammar.mode(child_id);
        let host = self
            .stack
            .last()
            .expect("a begin match always fires inside an active mode")
            .mode;
        let region = match child.begin.captures_from(self.input, winner.start) {
            Some(region) => region,
            None => {
                self.emitter.text(winner.start..winner.end);
                return;
            }
        };

        let mut at = winner.start;
        for (group, category) in parts {
            let Some((start, end)) = region.pos(*group) else {
                continue;
            };
            if end <= start || start < at {
                continue;
            }
            if start > at {
                // Text between fragments still belongs to the match.
                self.process_keywords(at..start, host);
            }
            match category {
                Some(category) => self.emitter.keyword(start..end, category),
                None => self.process_keywords(start..end, host),
            }
            at = end;
        }
        if at < winner.end {
            self.process_keywords(at..winner.end, host);
        }
    }

    fn end_modes(&mut self, end_owner: usize, winner: &Winner) {
        // When the ending mode also ends its parent, the close climbs the
        // stack. The root frame never pops.
        let mut owner = end_owner;
        while owner > 1 && self.grammar.mode(self.stack[owner].mode).ends_parent {
            owner -= 1;
        }

        let origin = self
            .grammar
            .mode(self.stack[self.stack.len() - 1].mode);
        if !(origin.return_end || origin.exclude_end) {
            self.buffer.end = winner.end;
        }
        self.flush_buffer();

        let starts = self.grammar.mode(self.stack[owner].mode).starts;
        while self.stack.len() > owner {
            let frame = self
                .stack
                .pop()
                .expect("the ending frame is still on the stack");
            if frame.opened {
                self.emitter.close();
            }
            let mode = self.grammar.mode(frame.mode);
            if mode.sub_languages.is_empty() {
                // Delegating modes score through their delegate instead.
                self.relevance += mode.relevance;
            }
        }

        if origin.return_end {
            // Leave the end text for the enclosing mode's rules.
            self.buffer = winner.start..winner.start;
            self.cursor = winner.start;
        } else if origin.exclude_end {
            // The end text belongs to the enclosing mode.
            self.buffer = winner.start..winner.end;
            self.cursor = winner.end;
        } else {
            self.buffer = winner.end..winner.end;
            self.cursor = winner.end;
        }

        if let Some(next) = starts {
            self.push_started_mode(next);
        }
    }

    /// Enter a continuation mode without a begin match.
    fn push_started_mode(&mut self, mode_id: ModeId) {
        if self.stack.len() >= self.options.max_mode_depth {
            self.truncated = true;
            return;
        }
        let mode = self.grammar.mode(mode_id);
        let opened = mode.category.is_some();
        if let Some(category) = &mode.category {
            self.emitter.open(category);
        }
        let candidates = build_candidates(self.grammar, &self.stack, mode_id);
        self.stack.push(Frame::new(mode_id, candidates, opened));
    }

    /// Hand the buffered range to the active mode: keyword processing, or
    /// delegation when the mode names sub-languages.
    fn flush_buffer(&mut self) {
        let range = self.buffer.clone();
        self.buffer = range.end..range.end;
        if range.is_empty() {
            return;
        }
        let top = self
            .stack
            .last()
            .expect("the root frame stays on the stack")
            .mode;
        if self.grammar.mode(top).sub_languages.is_empty() {
            self.process_keywords(range, top);
        } else {
            self.delegate(range, top);
        }
    }

    /// Emit `range`, lifting words found in the mode's keyword table out as
    /// their own categorized tokens.
    fn process_keywords(&mut self, range: Range<usize>, mode_id: ModeId) {
        if range.is_empty() {
            return;
        }
        let mode = self.grammar.mode(mode_id);
        let (table, pattern) = match (&mode.keywords, &mode.keyword_pattern) {
            (Some(table), Some(pattern)) => (table, pattern),
            _ => {
                self.emitter.text(range);
                return;
            }
        };

        let text = &self.input[range.clone()];
        let base = range.start;
        let mut pending = range.start;
        let mut at = 0usize;

        while let Some((start, end)) = pattern.find_from(text, at) {
            if end == start {
                at = advance_cursor(text, start);
                continue;
            }
            at = end;
            let word = &text[start..end];
            let Some((category, weight)) = table.lookup(word) else {
                continue;
            };

            let folded = if self.grammar.is_case_insensitive() {
                word.to_lowercase()
            } else {
                word.to_string()
            };
            let hits = self.keyword_hits.entry(folded).or_insert(0);
            *hits += 1;
            if *hits <= MAX_KEYWORD_HITS {
                self.relevance += weight;
            }

            if category.starts_with('_') {
                // Scores, but stays plain text.
                continue;
            }
            if pending < base + start {
                self.emitter.text(pending..base + start);
            }
            self.emitter.keyword(base + start..base + end, category);
            pending = base + end;
        }
        if pending < range.end {
            self.emitter.text(pending..range.end);
        }
    }

    /// Tokenize `range` with the first registered grammar the mode names and
    /// splice the result in. Anything that goes wrong degrades to text.
    fn delegate(&mut self, range: Range<usize>, mode_id: ModeId) {
        let mode = self.grammar.mode(mode_id);

        if self.depth >= self.options.max_sublanguage_depth {
            self.truncated = true;
            self.emitter.plain(range);
            return;
        }

        let delegate = mode
            .sub_languages
            .iter()
            .find_map(|name| self.registry.get(name));
        let Some(delegate) = delegate else {
            self.emitter.text(range);
            return;
        };

        let options = TokenizeOptions {
            ignore_illegals: true,
            ..self.options.clone()
        };
        match tokenize_at_depth(
            &delegate,
            self.registry,
            &self.input[range.clone()],
            &options,
            self.depth + 1,
        ) {
            Ok(sub) => {
                if mode.relevance > 0 {
                    self.relevance += sub.relevance();
                }
                if sub.is_truncated() {
                    self.truncated = true;
                }
                self.emitter.splice(sub.into_tokens(), range.start);
            }
            Err(_) => {
                // A failing delegate must not sink the host scan.
                self.emitter.plain(range);
            }
        }
    }
}
