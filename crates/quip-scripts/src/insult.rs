//! The insult script: pulls Shakespearean insults from Chris Seidel's
//! insulter page and scrapes the quote out of the HTML.

use async_trait::async_trait;
use regex::Regex;

use quip_core::{QuipError, Reply, ResolvedParams, Result, Script, ScriptDescriptor};

const INSULTER_URL: &str = "http://www.pangloss.com/seidel/Shaker/index.html";
const FAILURE: &str = "ERROR: Unable to retrieve insult";

pub const DESCRIPTOR: ScriptDescriptor = ScriptDescriptor {
    name: "insult",
    params: &[],
    help: Some("!insult - Insults you elegantly"),
    factory: Insult::factory,
};

pub struct Insult {
    quote_re: Regex,
}

impl Insult {
    fn factory(_params: &ResolvedParams) -> Result<Box<dyn Script>> {
        let quote_re = Regex::new(r"(?m)^.+?</font>$").map_err(|e| QuipError::Script {
            script: "insult".into(),
            reason: e.to_string(),
        })?;
        Ok(Box::new(Self { quote_re }))
    }

    async fn fetch_insult(&self) -> Option<String> {
        let body = reqwest::get(INSULTER_URL).await.ok()?.text().await.ok()?;
        let line = self.quote_re.find(&body)?.as_str();
        let quote = line.split('<').next()?.trim();
        if quote.is_empty() {
            None
        } else {
            Some(quote.to_string())
        }
    }
}

#[async_trait]
impl Script for Insult {
    fn name(&self) -> &'static str {
        "insult"
    }

    async fn on_message(
        &mut self,
        _sender: &str,
        _channel: &str,
        text: &str,
    ) -> Result<Option<Reply>> {
        if text.split_whitespace().next() != Some("!insult") {
            return Ok(None);
        }
        let reply = self
            .fetch_insult()
            .await
            .unwrap_or_else(|| FAILURE.to_string());
        Ok(Some(Reply::One(reply)))
    }
}
