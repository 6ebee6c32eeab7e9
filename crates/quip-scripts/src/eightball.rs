//! The eightball script: canned fortune-teller answers.

use async_trait::async_trait;
use rand::seq::SliceRandom;

use quip_core::{Reply, ResolvedParams, Result, Script, ScriptDescriptor};

const MESSAGES: &[&str] = &[
    "It is certain",
    "It is decidedly so",
    "Without a doubt",
    "Yes definitely",
    "You may rely on it",
    "As I see it, yes",
    "Most likely",
    "Outlook good",
    "Yes",
    "Signs point to yes",
    "Reply hazy try again",
    "Ask again later",
    "Better not tell you now",
    "Cannot predict now",
    "Concentrate and ask again",
    "Don't count on it",
    "My reply is no",
    "My sources say no",
    "Outlook not so good",
    "Very doubtful",
];

pub const DESCRIPTOR: ScriptDescriptor = ScriptDescriptor {
    name: "eightball",
    params: &[],
    help: Some("!8ball [question] - Seek answer from the magic 8-ball"),
    factory: EightBall::factory,
};

pub struct EightBall;

impl EightBall {
    fn factory(_params: &ResolvedParams) -> Result<Box<dyn Script>> {
        Ok(Box::new(Self))
    }
}

#[async_trait]
impl Script for EightBall {
    fn name(&self) -> &'static str {
        "eightball"
    }

    async fn on_message(
        &mut self,
        _sender: &str,
        _channel: &str,
        text: &str,
    ) -> Result<Option<Reply>> {
        if text.split_whitespace().next() != Some("!8ball") {
            return Ok(None);
        }
        let answer = MESSAGES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("Reply hazy try again");
        Ok(Some(Reply::from(answer)))
    }
}
