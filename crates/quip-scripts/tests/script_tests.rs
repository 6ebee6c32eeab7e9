#[cfg(test)]
mod tests {

    // ── MarkovEngine ───────────────────────────────────────────

    mod markov {
        use quip_scripts::MarkovEngine;
        use std::collections::HashSet;

        fn trained() -> MarkovEngine {
            let mut engine = MarkovEngine::new("quip");
            engine.observe("the cat sat");
            engine.observe("the dog ran");
            engine
        }

        #[test]
        fn test_empty_table_generates_empty_string() {
            let engine = MarkovEngine::new("quip");
            assert_eq!(engine.generate(""), "");
            assert_eq!(engine.generate("anything at all"), "");
        }

        #[test]
        fn test_generate_with_no_keywords_never_panics() {
            let engine = trained();
            for _ in 0..50 {
                let out = engine.generate("");
                assert!(!out.is_empty());
            }
        }

        #[test]
        fn test_generate_draws_only_from_vocabulary() {
            let engine = trained();
            let vocab: HashSet<&str> = ["the", "cat", "sat", "dog", "ran"].into();
            for _ in 0..100 {
                let out = engine.generate("the");
                assert!(!out.is_empty());
                for word in out.split_whitespace() {
                    let word = word.trim_end_matches('.');
                    if word.is_empty() {
                        continue;
                    }
                    assert!(vocab.contains(word), "unexpected word {word:?} in {out:?}");
                }
            }
        }

        #[test]
        fn test_trigger_word_is_not_a_keyword() {
            let mut engine = MarkovEngine::new("cat");
            engine.observe("the cat sat");
            // "cat" is in the table but is the trigger word; generation must
            // still work from the remaining context.
            for _ in 0..20 {
                let out = engine.generate("cat");
                assert!(!out.is_empty());
            }
        }

        #[test]
        fn test_blank_lines_are_ignored() {
            let mut engine = MarkovEngine::new("quip");
            engine.observe("");
            engine.observe("   ");
            assert!(engine.is_empty());
        }

        #[test]
        fn test_single_word_line() {
            let mut engine = MarkovEngine::new("quip");
            engine.observe("hello");
            for _ in 0..20 {
                assert_eq!(engine.generate("hello"), "hello");
            }
        }
    }

    // ── ReminderStore ──────────────────────────────────────────

    mod remind {
        use quip_scripts::ReminderStore;

        #[test]
        fn test_schedule_past_durlimit_is_refused() {
            let mut store = ReminderStore::new(10, 100);
            let refusal = store.schedule_at("#chan", 101, "late", 0).unwrap_err();
            assert!(refusal.contains("NOPE"));
            assert_eq!(store.pending("#chan"), 0);
        }

        #[test]
        fn test_schedule_at_tasklimit_is_refused() {
            let mut store = ReminderStore::new(2, 1000);
            store.schedule_at("#chan", 5, "one", 0).unwrap();
            store.schedule_at("#chan", 5, "two", 0).unwrap();
            assert!(store.schedule_at("#chan", 5, "three", 0).is_err());
            assert_eq!(store.pending("#chan"), 2);
            // Limits are per channel.
            assert!(store.schedule_at("#other", 5, "fine", 0).is_ok());
        }

        #[test]
        fn test_negative_delay_clamps_to_now() {
            let mut store = ReminderStore::new(10, 1000);
            store.schedule_at("#chan", -30, "asap", 100).unwrap();
            assert_eq!(store.poll_at("#chan", 100), vec!["asap"]);
        }

        #[test]
        fn test_poll_fires_in_scheduling_order_and_is_idempotent() {
            let mut store = ReminderStore::new(10, 1000);
            store.schedule_at("#chan", 60, "first", 0).unwrap();
            store.schedule_at("#chan", 30, "second", 0).unwrap();
            store.schedule_at("#chan", 500, "later", 0).unwrap();

            assert!(store.poll_at("#chan", 29).is_empty());
            // Both fired tasks come back in original scheduling order, not
            // fire-time order.
            assert_eq!(store.poll_at("#chan", 60), vec!["first", "second"]);
            assert!(store.poll_at("#chan", 60).is_empty());
            assert_eq!(store.pending("#chan"), 1);
            assert_eq!(store.poll_at("#chan", 500), vec!["later"]);
        }

        #[test]
        fn test_remind_minute_end_to_end() {
            // `!remind -m 1 hello` at t=0: nothing at t=30, fires at t=61.
            let mut store = ReminderStore::new(10, 604_800);
            store.schedule_at("#chan", 60, "hello", 0).unwrap();
            assert!(store.poll_at("#chan", 30).is_empty());
            assert_eq!(store.poll_at("#chan", 61), vec!["hello"]);
        }
    }

    // ── ReplaceCache ───────────────────────────────────────────

    mod replace {
        use quip_scripts::replace::LineSelector;
        use quip_scripts::ReplaceCache;

        fn seeded() -> ReplaceCache {
            let mut cache = ReplaceCache::new(3);
            cache.record("alice", "oldest line");
            cache.record("alice", "middle line");
            cache.record("alice", "foo fighters");
            cache
        }

        #[test]
        fn test_record_evicts_beyond_maxlines() {
            let mut cache = seeded();
            cache.record("alice", "newest");
            // "oldest line" fell off the back.
            assert!(cache
                .substitute("alice", "oldest", "x", LineSelector::Search)
                .is_err());
            assert_eq!(
                cache
                    .substitute("alice", "middle", "last", LineSelector::Line(3))
                    .unwrap(),
                "last line"
            );
        }

        #[test]
        fn test_substitute_latest() {
            let cache = seeded();
            assert_eq!(
                cache
                    .substitute("alice", "foo", "bar", LineSelector::Latest)
                    .unwrap(),
                "bar fighters"
            );
        }

        #[test]
        fn test_substitute_explicit_line() {
            let cache = seeded();
            assert_eq!(
                cache
                    .substitute("alice", "line", "word", LineSelector::Line(2))
                    .unwrap(),
                "middle word"
            );
        }

        #[test]
        fn test_substitute_search_scans_front_to_back() {
            let cache = seeded();
            assert_eq!(
                cache
                    .substitute("alice", "l.ne", "thing", LineSelector::Search)
                    .unwrap(),
                "middle thing"
            );
        }

        #[test]
        fn test_invalid_regex_reply_names_the_user() {
            let cache = seeded();
            let err = cache
                .substitute("alice", "(unclosed", "x", LineSelector::Latest)
                .unwrap_err();
            assert!(err.contains("alice"), "error should name the user: {err}");
        }

        #[test]
        fn test_no_history_and_bad_line_and_no_match() {
            let cache = seeded();
            assert!(cache
                .substitute("bob", "a", "b", LineSelector::Latest)
                .is_err());
            assert!(cache
                .substitute("alice", "a", "b", LineSelector::Line(9))
                .is_err());
            assert!(cache
                .substitute("alice", "a", "b", LineSelector::Line(0))
                .is_err());
            assert_eq!(
                cache
                    .substitute("alice", "zzz", "b", LineSelector::Search)
                    .unwrap_err(),
                "Unable to find anything that matches pattern!"
            );
        }

        #[test]
        fn test_substitute_replaces_every_occurrence() {
            let mut cache = ReplaceCache::new(2);
            cache.record("alice", "aaa");
            assert_eq!(
                cache
                    .substitute("alice", "a", "b", LineSelector::Latest)
                    .unwrap(),
                "bbb"
            );
        }
    }

    // ── Script handlers end to end ─────────────────────────────

    mod handlers {
        use quip_config::ScriptsConfig;
        use quip_core::{Reply, Script};
        use quip_scripts::ScriptRegistry;

        fn scripts_config(raw: &str) -> ScriptsConfig {
            toml::from_str(raw).expect("test config parses")
        }

        fn single(replies: Vec<Reply>) -> String {
            assert_eq!(replies.len(), 1, "expected one reply, got {replies:?}");
            match replies.into_iter().next().unwrap() {
                Reply::One(line) => line,
                Reply::Many(mut lines) => {
                    assert_eq!(lines.len(), 1);
                    lines.pop().unwrap()
                }
            }
        }

        /// A registry with only the named script enabled.
        fn registry_with(name: &str, extra: &str) -> ScriptRegistry {
            let raw = format!("enable_default = false\nenable_{name} = true\n{extra}");
            ScriptRegistry::load(&scripts_config(&raw))
        }

        #[tokio::test]
        async fn test_replace_structured_command() {
            let mut registry = registry_with("replace", "");
            assert!(registry
                .dispatch_message("alice", "#chan", "foo fighters")
                .await
                .is_empty());
            let replies = registry
                .dispatch_message("alice", "#chan", "!replace foo bar")
                .await;
            assert_eq!(single(replies), "alice meant: bar fighters");
        }

        #[tokio::test]
        async fn test_replace_shorthand_and_escaped_slash() {
            let mut registry = registry_with("replace", "");
            registry
                .dispatch_message("alice", "#chan", "good a/b pair")
                .await;
            let replies = registry
                .dispatch_message("alice", "#chan", r"s/a\/b/c/")
                .await;
            assert_eq!(single(replies), "alice meant: good c pair");
        }

        #[tokio::test]
        async fn test_replace_shorthand_line_and_search_flags() {
            let mut registry = registry_with("replace", "");
            registry.dispatch_message("alice", "#chan", "first one").await;
            registry.dispatch_message("alice", "#chan", "second one").await;
            let replies = registry
                .dispatch_message("alice", "#chan", "s/one/two/2")
                .await;
            assert_eq!(single(replies), "alice meant: first two");
            let replies = registry
                .dispatch_message("alice", "#chan", "s/first/final/s")
                .await;
            assert_eq!(single(replies), "alice meant: final one");
        }

        #[tokio::test]
        async fn test_replace_explicit_line_beats_search_flag() {
            let mut registry = registry_with("replace", "");
            registry.dispatch_message("alice", "#chan", "first one").await;
            registry.dispatch_message("alice", "#chan", "second one").await;
            // -s alone would pick "second one"; -l 2 must win regardless of
            // flag order, as it does in the shorthand form.
            let replies = registry
                .dispatch_message("alice", "#chan", "!replace -l 2 -s one two")
                .await;
            assert_eq!(single(replies), "alice meant: first two");
            let replies = registry
                .dispatch_message("alice", "#chan", "!replace -s -l 2 one three")
                .await;
            assert_eq!(single(replies), "alice meant: first three");
        }

        #[tokio::test]
        async fn test_replace_result_is_truncated() {
            let mut registry = registry_with("replace", "replace_maxlength = 10");
            registry.dispatch_message("alice", "#chan", "short x").await;
            let replies = registry
                .dispatch_message("alice", "#chan", "!replace x abcdefghijklmnop")
                .await;
            let line = single(replies);
            assert!(line.ends_with("[...]"), "expected truncation marker: {line}");
        }

        #[tokio::test]
        async fn test_remind_syntax_error_and_success() {
            let mut registry = registry_with("remind", "");
            let replies = registry
                .dispatch_message("bob", "#chan", "!remind soon coffee")
                .await;
            assert!(single(replies).starts_with("Syntax:"));
            let replies = registry
                .dispatch_message("bob", "#chan", "!remind -s 0 coffee")
                .await;
            assert_eq!(single(replies), "Task registered");
            // Fire time already passed, so the next poll flushes it.
            let polled = registry.dispatch_poll("#chan").await;
            assert_eq!(single(polled), "coffee");
            assert!(registry.dispatch_poll("#chan").await.is_empty());
        }

        #[tokio::test]
        async fn test_remind_durlimit_refusal_stores_nothing() {
            let mut registry = registry_with("remind", "remind_durlimit = 60");
            let replies = registry
                .dispatch_message("bob", "#chan", "!remind -h 2 way too late")
                .await;
            assert!(single(replies).contains("NOPE"));
            assert!(registry.dispatch_poll("#chan").await.is_empty());
        }

        #[tokio::test]
        async fn test_weather_rejects_bad_zip_offline() {
            let mut registry = registry_with("weather", "");
            let replies = registry.dispatch_message("bob", "#chan", "!w 90210x").await;
            assert_eq!(single(replies), "ERROR: Zip code is not in 5-digit format!");
            let replies = registry.dispatch_message("bob", "#chan", "!w 123").await;
            assert_eq!(single(replies), "ERROR: Zip code is not in 5-digit format!");
        }

        #[tokio::test]
        async fn test_choose_and_eightball() {
            let mut registry = registry_with("choose", "enable_eightball = true");
            let replies = registry
                .dispatch_message("bob", "#chan", "!choose tea coffee")
                .await;
            let line = single(replies);
            assert!(line == "I choose: tea" || line == "I choose: coffee");
            let replies = registry.dispatch_message("bob", "#chan", "!choose").await;
            assert_eq!(single(replies), "NO, YOU");
            assert_eq!(registry.dispatch_message("bob", "#chan", "!8ball").await.len(), 1);
        }

        #[tokio::test]
        async fn test_markov_script_responds_to_trigger() {
            let mut registry = registry_with("markov", "markov_respond = \"quip\"");
            registry.dispatch_message("bob", "#chan", "the cat sat").await;
            let replies = registry
                .dispatch_message("bob", "#chan", "hey quip, the floor is yours")
                .await;
            let line = single(replies);
            assert!(!line.is_empty());
        }

        #[tokio::test]
        async fn test_markov_trains_from_sample_file() {
            use std::io::Write;
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "the cat sat").unwrap();
            writeln!(file, "quip is ignored entirely").unwrap();
            let extra = format!(
                "markov_respond = \"quip\"\nmarkov_listen = false\nmarkov_path = {:?}",
                file.path()
            );
            let mut registry = registry_with("markov", &extra);
            let replies = registry.dispatch_message("bob", "#chan", "quip: cat").await;
            let line = single(replies);
            for word in line.split_whitespace() {
                assert!(["the", "cat", "sat"].contains(&word.trim_end_matches('.')));
            }
        }
    }

    // ── Registry lifecycle ─────────────────────────────────────

    mod registry {
        use async_trait::async_trait;
        use quip_config::ScriptsConfig;
        use quip_core::{QuipError, Reply, Result, Script};
        use quip_scripts::ScriptRegistry;

        fn scripts_config(raw: &str) -> ScriptsConfig {
            toml::from_str(raw).expect("test config parses")
        }

        struct Faulty;

        #[async_trait]
        impl Script for Faulty {
            fn name(&self) -> &'static str {
                "faulty"
            }
            async fn on_message(&mut self, _: &str, _: &str, _: &str) -> Result<Option<Reply>> {
                Err(QuipError::Script {
                    script: "faulty".into(),
                    reason: "always broken".into(),
                })
            }
        }

        struct Echo;

        #[async_trait]
        impl Script for Echo {
            fn name(&self) -> &'static str {
                "echo"
            }
            async fn on_message(&mut self, _: &str, _: &str, text: &str) -> Result<Option<Reply>> {
                Ok(Some(Reply::One(text.to_string())))
            }
        }

        #[test]
        fn test_load_respects_enablement() {
            let registry = ScriptRegistry::load(&scripts_config(
                "enable_default = false\nenable_remind = true\nenable_choose = true",
            ));
            assert_eq!(registry.names(), vec!["remind", "choose"]);
        }

        #[test]
        fn test_default_flag_loads_everything() {
            let registry = ScriptRegistry::load(&scripts_config("enable_default = true"));
            assert_eq!(registry.len(), quip_scripts::registry::DESCRIPTORS.len());
        }

        #[test]
        fn test_bad_parameter_skips_only_that_script() {
            // remind_tasklimit has the wrong type; remind is dropped, the
            // rest of the load continues.
            let registry = ScriptRegistry::load(&scripts_config(
                "enable_default = false\nenable_remind = true\nenable_choose = true\n\
                 remind_tasklimit = \"lots\"",
            ));
            assert_eq!(registry.names(), vec!["choose"]);
        }

        #[test]
        fn test_bad_enablement_key_skips_only_that_script() {
            let registry = ScriptRegistry::load(&scripts_config(
                "enable_default = false\nenable_remind = 7\nenable_choose = true",
            ));
            assert_eq!(registry.names(), vec!["choose"]);
        }

        #[tokio::test]
        async fn test_dispatch_isolates_a_failing_script() {
            let mut registry = ScriptRegistry::empty();
            registry.push(Box::new(Faulty));
            registry.push(Box::new(Echo));
            let replies = registry.dispatch_message("bob", "#chan", "hello").await;
            assert_eq!(replies, vec![Reply::One("hello".into())]);
        }

        #[tokio::test]
        async fn test_help_enumerates_and_resolves() {
            let mut registry = ScriptRegistry::load(&scripts_config(
                "enable_default = false\nenable_remind = true\nenable_choose = true",
            ));
            let replies = registry.dispatch_message("bob", "#chan", "!help").await;
            assert_eq!(replies, vec![Reply::One("Scripts: remind, choose".into())]);

            let replies = registry.dispatch_message("bob", "#chan", "!help remind").await;
            match &replies[0] {
                Reply::One(line) => assert!(line.starts_with("!remind")),
                other => panic!("unexpected reply {other:?}"),
            }

            // weather exists but is not loaded; nonsense never existed.
            for name in ["weather", "nonsense"] {
                let replies = registry
                    .dispatch_message("bob", "#chan", &format!("!help {name}"))
                    .await;
                assert_eq!(
                    replies,
                    vec![Reply::One(format!("Unknown or inactive script: {name}"))]
                );
            }
        }

        #[test]
        fn test_clear_empties_the_registry() {
            let mut registry =
                ScriptRegistry::load(&scripts_config("enable_default = true"));
            assert!(!registry.is_empty());
            registry.clear();
            assert!(registry.is_empty());
        }
    }
}
