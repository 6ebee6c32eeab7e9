//! The markov script: listens to channel conversation, builds word-adjacency
//! tables, and speaks when somebody says the magic word.

use async_trait::async_trait;
use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;
use std::collections::{HashMap, VecDeque};
use std::io::{BufRead, Write};

use quip_core::{
    ParamDefault, ParamSpec, QuipError, Reply, ResolvedParams, Result, Script, ScriptDescriptor,
};

/// A training token. `None` is the boundary sentinel marking the start or
/// end of a line, which is how the tables learn where sentences stop.
type Token = Option<String>;

/// Lookup key for one of the three simultaneously-maintained chain orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ChainKey {
    /// Order 0: no context at all.
    Root,
    /// Order 1: a single word of context.
    One(String),
    /// Order 2: an ordered pair. Boundary tokens can appear here from
    /// training, though generation only ever queries real-word pairs.
    Two(Token, Token),
}

/// Frequency counters for the words observed immediately before and after a
/// key in training text.
#[derive(Debug, Default)]
struct Link {
    before: HashMap<Token, u32>,
    after: HashMap<Token, u32>,
}

impl Link {
    fn counter(&self, prepend: bool) -> &HashMap<Token, u32> {
        if prepend {
            &self.before
        } else {
            &self.after
        }
    }
}

/// Learns word-adjacency statistics from a stream of lines and synthesizes
/// new text echoing the learned style.
///
/// The stop-probability formula (`boundary_count * step_mult / total`) and
/// its companion constants are empirically tuned, so they are plain fields
/// rather than baked-in semantics.
pub struct MarkovEngine {
    table: HashMap<ChainKey, Link>,
    /// Trigger word, excluded from keyword extraction.
    respond: String,
    /// Per-step increment of the stop multiplier; expansion ends before the
    /// multiplier reaches 200%.
    pub stop_step: f64,
    /// Length budget (chars) past which no further sentences are appended.
    pub expand_limit: usize,
    /// Chance of chaining another sentence while keywords remain.
    pub sentence_chance: f64,
    /// Chance of preferring a remaining keyword as the next word.
    pub keyword_chance: f64,
}

impl MarkovEngine {
    pub fn new(respond: impl Into<String>) -> Self {
        Self {
            table: HashMap::new(),
            respond: respond.into(),
            stop_step: 0.2,
            expand_limit: 50,
            sentence_chance: 0.7,
            keyword_chance: 0.4,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Train on one line. Every sliding window of three consecutive tokens
    /// (boundary-padded at both ends) updates all three chain orders in a
    /// single pass.
    pub fn observe(&mut self, line: &str) {
        let words: Vec<Token> = line.split_whitespace().map(|w| Some(w.to_string())).collect();
        if words.is_empty() {
            return;
        }
        let mut padded: Vec<Token> = Vec::with_capacity(words.len() + 2);
        padded.push(None);
        padded.extend(words);
        padded.push(None);

        for i in 1..padded.len() - 1 {
            let before = padded[i - 1].clone();
            let Some(mid) = padded[i].clone() else {
                continue;
            };
            let after = padded[i + 1].clone();

            let root = self.table.entry(ChainKey::Root).or_default();
            *root.before.entry(before.clone()).or_insert(0) += 1;
            *root.after.entry(after.clone()).or_insert(0) += 1;

            let one = self.table.entry(ChainKey::One(mid.clone())).or_default();
            *one.before.entry(before.clone()).or_insert(0) += 1;
            *one.after.entry(after.clone()).or_insert(0) += 1;

            let lead_pair = ChainKey::Two(before.clone(), Some(mid.clone()));
            let trail_pair = ChainKey::Two(Some(mid.clone()), after.clone());
            let trail = self.table.entry(trail_pair).or_default();
            *trail.before.entry(before).or_insert(0) += 1;
            let lead = self.table.entry(lead_pair).or_default();
            *lead.after.entry(after).or_insert(0) += 1;
        }
    }

    /// Tokens from the trigger message that exist as order-1 keys and are
    /// not the trigger word itself.
    fn filter_keywords(&self, text: &str) -> Vec<String> {
        text.split_whitespace()
            .filter(|w| {
                !w.contains(&self.respond)
                    && self.table.contains_key(&ChainKey::One((*w).to_string()))
            })
            .map(String::from)
            .collect()
    }

    /// Pick the next word in one direction, or `None` to stop expanding.
    ///
    /// `stop_mult` scales the boundary count's share of the distribution into
    /// a stop probability, so later steps terminate more readily.
    fn next_word(
        &self,
        key: &ChainKey,
        keywords: &mut Vec<String>,
        prepend: bool,
        stop_mult: f64,
        rng: &mut impl Rng,
    ) -> Option<String> {
        let link = self.table.get(key)?;
        let counter = link.counter(prepend);
        if counter.len() == 1 {
            // Sole continuation: no sampling needed. A lone boundary stops.
            return counter.keys().next().cloned().flatten();
        }

        if rng.gen::<f64>() < self.keyword_chance {
            let chainable: Vec<usize> = keywords
                .iter()
                .enumerate()
                .filter(|(_, k)| counter.contains_key(&Some((*k).clone())))
                .map(|(i, _)| i)
                .collect();
            if let Some(&idx) = chainable.as_slice().choose(rng) {
                return Some(keywords.remove(idx));
            }
        }

        let total: u32 = counter.values().sum();
        let boundary = counter.get(&None).copied().unwrap_or(0);
        if total == 0 || boundary == total {
            return None;
        }
        let stop_chance = f64::from(boundary) * stop_mult / f64::from(total);
        if rng.gen::<f64>() < stop_chance {
            return None;
        }

        // Frequency-weighted sample over the real-word continuations.
        let mut pick = rng.gen_range(0..total - boundary);
        for (token, count) in counter {
            let Some(word) = token else { continue };
            if pick < *count {
                if let Some(idx) = keywords.iter().position(|k| k == word) {
                    keywords.remove(idx);
                }
                return Some(word.clone());
            }
            pick -= count;
        }
        None
    }

    /// Build one sentence: seed a start word, then expand left and right
    /// independently, escalating from single-word to pair context after the
    /// first step in each direction.
    fn generate_sentence(&self, keywords: &mut Vec<String>, rng: &mut impl Rng) -> String {
        let base = if keywords.is_empty() {
            let Some(word) = self
                .table
                .keys()
                .filter_map(|k| match k {
                    ChainKey::One(w) => Some(w.clone()),
                    _ => None,
                })
                .choose(rng)
            else {
                return String::new();
            };
            word
        } else {
            keywords.remove(rng.gen_range(0..keywords.len()))
        };

        let mut sentence: VecDeque<String> = VecDeque::new();
        sentence.push_back(base.clone());

        for prepend in [true, false] {
            let first = self.next_word(&ChainKey::One(base.clone()), keywords, prepend, 0.0, rng);
            let Some(first) = first else { continue };
            if prepend {
                sentence.push_front(first);
            } else {
                sentence.push_back(first);
            }
            let mut mult = self.stop_step;
            while mult < 2.0 {
                let pair = if prepend {
                    ChainKey::Two(Some(sentence[0].clone()), Some(sentence[1].clone()))
                } else {
                    ChainKey::Two(
                        Some(sentence[sentence.len() - 2].clone()),
                        Some(sentence[sentence.len() - 1].clone()),
                    )
                };
                let Some(word) = self.next_word(&pair, keywords, prepend, mult, rng) else {
                    break;
                };
                if prepend {
                    sentence.push_front(word);
                } else {
                    sentence.push_back(word);
                }
                mult += self.stop_step;
            }
        }

        sentence.into_iter().collect::<Vec<_>>().join(" ")
    }

    /// Generate a response seeded by `text`. Returns an empty string when the
    /// tables are empty. Sentences chain geometrically while keywords remain
    /// and the length budget holds.
    pub fn generate(&self, text: &str) -> String {
        let mut rng = rand::thread_rng();
        let mut keywords = self.filter_keywords(text);
        let mut msg = self.generate_sentence(&mut keywords, &mut rng);
        while !keywords.is_empty()
            && msg.chars().count() < self.expand_limit
            && rng.gen::<f64>() < self.sentence_chance
        {
            msg.push_str(". ");
            msg.push_str(&self.generate_sentence(&mut keywords, &mut rng));
        }
        msg
    }
}

// ── The script wrapper ─────────────────────────────────────────

const PARAMS: &[ParamSpec] = &[
    ParamSpec::new("path", ParamDefault::Str("")),
    ParamSpec::new("listen", ParamDefault::Bool(true)),
    ParamSpec::new("record", ParamDefault::Bool(false)),
    ParamSpec::new("respond", ParamDefault::Str("quip")),
];

pub const DESCRIPTOR: ScriptDescriptor = ScriptDescriptor {
    name: "markov",
    params: PARAMS,
    help: Some("Call quip's name, and it shall respond..."),
    factory: Markov::factory,
};

pub struct Markov {
    engine: MarkovEngine,
    listen: bool,
    respond: String,
    sample: Option<std::fs::File>,
}

impl Markov {
    fn factory(params: &ResolvedParams) -> Result<Box<dyn Script>> {
        let path = params.get_str("path")?.to_string();
        let listen = params.get_bool("listen")?;
        let record = params.get_bool("record")?;
        let respond = params.get_str("respond")?.to_string();

        let mut engine = MarkovEngine::new(respond.clone());
        let mut sample = None;
        if !path.is_empty() {
            // A broken or absent sample file is non-fatal: start cold.
            match std::fs::File::open(&path) {
                Ok(file) => {
                    for line in std::io::BufReader::new(file).lines() {
                        let line = line.unwrap_or_default();
                        if !line.contains(&respond) {
                            engine.observe(&line);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(path, error = %e, "markov sample file unavailable, starting empty");
                }
            }
            if record {
                match std::fs::OpenOptions::new().create(true).append(true).open(&path) {
                    Ok(file) => sample = Some(file),
                    Err(e) => {
                        return Err(QuipError::Script {
                            script: "markov".into(),
                            reason: format!("cannot open {path} for recording: {e}"),
                        })
                    }
                }
            }
        }

        Ok(Box::new(Self {
            engine,
            listen,
            respond,
            sample,
        }))
    }
}

#[async_trait]
impl Script for Markov {
    fn name(&self) -> &'static str {
        "markov"
    }

    async fn on_message(
        &mut self,
        _sender: &str,
        _channel: &str,
        text: &str,
    ) -> Result<Option<Reply>> {
        if text.split_whitespace().next().is_none() {
            return Ok(None);
        }
        if text.contains(&self.respond) {
            return Ok(Some(Reply::One(self.engine.generate(text))));
        }
        if self.listen {
            self.engine.observe(text);
            if let Some(file) = self.sample.as_mut() {
                if let Err(e) = writeln!(file, "{text}") {
                    tracing::warn!(error = %e, "failed to record markov sample line");
                }
            }
        }
        Ok(None)
    }
}
