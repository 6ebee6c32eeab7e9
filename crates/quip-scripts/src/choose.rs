//! The choose script: outsource your decisions.

use async_trait::async_trait;
use rand::seq::SliceRandom;

use quip_core::{Reply, ResolvedParams, Result, Script, ScriptDescriptor};

pub const DESCRIPTOR: ScriptDescriptor = ScriptDescriptor {
    name: "choose",
    params: &[],
    help: Some(
        "!choose [choices...] - Helps you make a decision (DISCLAIMER: not \
         liable for any damage or consequence that results from said decision)",
    ),
    factory: Choose::factory,
};

pub struct Choose;

impl Choose {
    fn factory(_params: &ResolvedParams) -> Result<Box<dyn Script>> {
        Ok(Box::new(Self))
    }
}

#[async_trait]
impl Script for Choose {
    fn name(&self) -> &'static str {
        "choose"
    }

    async fn on_message(
        &mut self,
        _sender: &str,
        _channel: &str,
        text: &str,
    ) -> Result<Option<Reply>> {
        let text = text.to_lowercase();
        let mut words = text.split_whitespace();
        if words.next() != Some("!choose") {
            return Ok(None);
        }
        let choices: Vec<&str> = words.collect();
        let reply = match choices.choose(&mut rand::thread_rng()) {
            Some(choice) => format!("I choose: {choice}"),
            None => "NO, YOU".to_string(),
        };
        Ok(Some(Reply::One(reply)))
    }
}
