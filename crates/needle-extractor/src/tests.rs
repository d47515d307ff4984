//! Pipeline scenarios for the Extractor

#[cfg(test)]
mod tests {
    use crate::{
        ExtractionRequest, Extractor, ExtractorConfig, ExtractorError, GatewayConfig,
        ProgressReporter, RetryPolicy, WordCounter,
    };
    use needle_domain::{FieldKind, FieldSpec, FieldValue, RecordSchema, SchemaRegistry};
    use needle_llm::MockProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    const NO_ITEMS: &str = r#"{"items": []}"#;

    fn test_config(max_chunk_tokens: usize) -> ExtractorConfig {
        ExtractorConfig {
            max_chunk_tokens,
            gateway: GatewayConfig {
                max_concurrency: 8,
                request_timeout_secs: 1,
                retry: RetryPolicy {
                    max_attempts: 5,
                    min_backoff_ms: 0,
                    max_backoff_ms: 1,
                    base_backoff_ms: 1,
                },
                ..GatewayConfig::default()
            },
            ..ExtractorConfig::default()
        }
    }

    fn extractor(provider: MockProvider, max_chunk_tokens: usize) -> Extractor<MockProvider> {
        Extractor::with_token_counter(provider, test_config(max_chunk_tokens), Arc::new(WordCounter))
            .unwrap()
    }

    fn tech_company() -> RecordSchema {
        SchemaRegistry::with_builtins()
            .get("TechCompany")
            .unwrap()
            .clone()
    }

    fn pair_schema() -> RecordSchema {
        RecordSchema::new(
            "Pair",
            vec![
                FieldSpec::bare("name", FieldKind::String),
                FieldSpec::bare("location", FieldKind::String),
            ],
        )
        .unwrap()
    }

    fn name_of(record: &needle_domain::Record) -> Option<&FieldValue> {
        record.get("name")
    }

    #[tokio::test]
    async fn test_single_needle_extracted() {
        let provider = MockProvider::new(
            r#"{"items": [{"name": "Acme Corp", "location": "Springfield", "employee_count": null, "founding_year": null}]}"#,
        );
        let extractor = extractor(provider.clone(), 1000);
        let request = ExtractionRequest::new(
            "Acme Corp is a tech company located in Springfield.",
            tech_company(),
        );

        let result = extractor.extract(request).await;

        assert_eq!(result.needles.len(), 1);
        let needle = &result.needles[0];
        assert_eq!(needle.get("name"), Some(&FieldValue::from("Acme Corp")));
        assert_eq!(needle.get("location"), Some(&FieldValue::from("Springfield")));
        assert_eq!(needle.get("employee_count"), Some(&FieldValue::Null));
        assert_eq!(result.metadata.chunks_total, 1);
        assert_eq!(result.metadata.schema_name, "TechCompany");
        assert_eq!(result.metadata.model_name, "mock");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_acme_two_paragraphs_one_chunk() {
        let provider = MockProvider::new(
            r#"{"items": [{"name": "Acme Corp", "location": "Springfield"}]}"#,
        );
        let extractor = extractor(provider.clone(), 1000);
        let haystack = "Acme Corp is a tech company.\n\nIt is located in Springfield.";

        let result = extractor
            .extract(ExtractionRequest::new(haystack, pair_schema()))
            .await;

        assert_eq!(result.metadata.chunks_total, 1);
        assert_eq!(provider.call_count(), 1);
        assert_eq!(result.needles.len(), 1);
        assert_eq!(result.needles[0].populated_count(), 2);
        assert_eq!(name_of(&result.needles[0]), Some(&FieldValue::from("Acme Corp")));
        assert_eq!(
            result.needles[0].get("location"),
            Some(&FieldValue::from("Springfield"))
        );
    }

    #[tokio::test]
    async fn test_sparse_records_filtered() {
        let mut provider = MockProvider::new(NO_ITEMS);
        provider.add_response("alpha", r#"{"items": [{"name": "X", "location": null}]}"#);
        provider.add_response("beta", r#"{"items": [{"name": " null ", "location": ""}]}"#);
        let extractor = extractor(provider.clone(), 3);

        let haystack = "alpha one two\n\nbeta three four";
        let result = extractor
            .extract(ExtractionRequest::new(haystack, pair_schema()))
            .await;

        assert_eq!(result.metadata.chunks_total, 2);
        assert_eq!(result.metadata.candidates_total, 2);
        assert_eq!(result.metadata.filtered_out, 1);
        assert_eq!(result.needles.len(), 1);
        assert_eq!(name_of(&result.needles[0]), Some(&FieldValue::from("X")));
        assert_eq!(result.needles[0].get("location"), Some(&FieldValue::Null));
    }

    #[tokio::test]
    async fn test_ambiguous_verification_keeps_record() {
        let mut provider = MockProvider::new(r#"{"items": [{"name": "Acme Corp", "location": null}]}"#);
        provider.add_response("Extracted Information", "maybe");
        let extractor = extractor(provider.clone(), 1000);

        let request =
            ExtractionRequest::new("Acme Corp is hiring.", pair_schema()).with_verification(true);
        let result = extractor.extract(request).await;

        assert_eq!(result.needles.len(), 1);
        assert_eq!(result.metadata.rejected_by_verification, 0);
        assert_eq!(provider.calls_matching("Extracted Information"), 1);

        let verification = provider
            .requests()
            .into_iter()
            .find(|r| r.max_tokens == Some(1))
            .unwrap();
        assert!(verification.messages[1]
            .content
            .starts_with("Text:\nAcme Corp is hiring.\n\nExtracted Information:\n"));
    }

    #[tokio::test]
    async fn test_negative_verification_drops_record() {
        let mut provider = MockProvider::new(NO_ITEMS);
        provider.add_response("\"name\": \"Globex\"", "false");
        provider.add_response("Extracted Information", "true");
        provider.add_response(
            "Extract the information",
            r#"{"items": [{"name": "Globex", "location": null}, {"name": "Acme Corp", "location": null}]}"#,
        );
        let extractor = extractor(provider, 1000);

        let request = ExtractionRequest::new("Globex and Acme Corp.", pair_schema())
            .with_verification(true);
        let result = extractor.extract(request).await;

        assert_eq!(result.needles.len(), 1);
        assert_eq!(name_of(&result.needles[0]), Some(&FieldValue::from("Acme Corp")));
        assert_eq!(result.metadata.rejected_by_verification, 1);
    }

    #[tokio::test]
    async fn test_failed_verification_call_drops_record() {
        let mut provider = MockProvider::new(r#"{"items": [{"name": "Acme Corp", "location": null}]}"#);
        provider.add_error("Extracted Information");
        let extractor = extractor(provider.clone(), 1000);

        let request =
            ExtractionRequest::new("Acme Corp is hiring.", pair_schema()).with_verification(true);
        let result = extractor.extract(request).await;

        assert!(result.needles.is_empty());
        assert_eq!(result.metadata.rejected_by_verification, 1);
        assert_eq!(provider.calls_matching("Extracted Information"), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_chunk_contributes_nothing() {
        let mut provider = MockProvider::new(NO_ITEMS);
        provider.add_stall("gamma", Duration::from_secs(30), NO_ITEMS);
        provider.add_response("delta", r#"{"items": [{"name": "Initech", "location": "Austin"}]}"#);
        let extractor = extractor(provider.clone(), 3);

        let haystack = "gamma one two\n\ndelta three four";
        let result = extractor
            .extract(ExtractionRequest::new(haystack, pair_schema()))
            .await;

        assert_eq!(result.needles.len(), 1);
        assert_eq!(name_of(&result.needles[0]), Some(&FieldValue::from("Initech")));
        assert_eq!(result.metadata.chunks_total, 2);
        assert_eq!(result.metadata.chunks_failed, 1);
        assert_eq!(provider.calls_matching("gamma"), 5);
        assert_eq!(provider.calls_matching("delta"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_output_follows_chunk_order() {
        let mut provider = MockProvider::new(NO_ITEMS);
        // The first chunk answers last
        provider.add_stall(
            "first",
            Duration::from_millis(200),
            r#"{"items": [{"name": "A", "location": null}]}"#,
        );
        provider.add_response("second", r#"{"items": [{"name": "B", "location": null}]}"#);
        let extractor = extractor(provider, 2);

        let result = extractor
            .extract(ExtractionRequest::new("first chunk\n\nsecond chunk", pair_schema()))
            .await;

        let names: Vec<_> = result.needles.iter().filter_map(name_of).collect();
        assert_eq!(names, vec![&FieldValue::from("A"), &FieldValue::from("B")]);
    }

    #[tokio::test]
    async fn test_duplicates_across_chunks_removed() {
        let provider = MockProvider::new(
            r#"{"items": [{"name": "Acme Corp", "location": "Springfield"}]}"#,
        );
        let extractor = extractor(provider.clone(), 2);

        let result = extractor
            .extract(ExtractionRequest::new("one two\n\nthree four\n\nfive six", pair_schema()))
            .await;

        assert_eq!(provider.call_count(), 3);
        assert_eq!(result.metadata.candidates_total, 3);
        assert_eq!(result.metadata.duplicates_removed, 2);
        assert_eq!(result.needles.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_responses_degrade_to_empty() {
        let provider = MockProvider::new("I could not find anything.");
        let extractor = extractor(provider.clone(), 1000);

        let result = extractor
            .extract(ExtractionRequest::new("Some text.", pair_schema()))
            .await;

        assert!(result.needles.is_empty());
        assert_eq!(result.metadata.chunks_failed, 1);
        assert_eq!(provider.call_count(), 5);
    }

    #[tokio::test]
    async fn test_dialogue_removed_before_chunking() {
        let mut provider = MockProvider::new(NO_ITEMS);
        provider.add_response("Acme", r#"{"items": [{"name": "Acme Corp", "location": null}]}"#);
        let extractor = extractor(provider.clone(), 1000);

        let haystack = "He said \"Acme Corp is hiring\" and left.\n\nThe end.";
        let request = ExtractionRequest::new(haystack, pair_schema()).with_dialogue_removed(true);
        let result = extractor.extract(request).await;

        assert!(result.needles.is_empty());
        let sent = provider.requests();
        assert_eq!(sent.len(), 1);
        assert!(!sent[0].messages[1].content.contains("Acme"));
    }

    #[tokio::test]
    async fn test_examples_reach_system_prompt() {
        let provider = MockProvider::new(NO_ITEMS);
        let extractor = extractor(provider.clone(), 1000);

        let request = ExtractionRequest::new("Text.", tech_company())
            .with_examples(vec!["Acme Corp is a tech company in Springfield.".to_string()]);
        extractor.extract(request).await;

        let sent = provider.requests();
        assert!(sent[0].messages[0]
            .content
            .contains("Acme Corp is a tech company in Springfield."));
    }

    #[tokio::test]
    async fn test_empty_haystack() {
        let provider = MockProvider::new(NO_ITEMS);
        let extractor = extractor(provider.clone(), 1000);

        let result = extractor
            .extract(ExtractionRequest::new("", tech_company()))
            .await;

        assert!(result.needles.is_empty());
        assert_eq!(result.metadata.chunks_total, 0);
        assert_eq!(provider.call_count(), 0);
    }

    #[derive(Default)]
    struct CountingProgress {
        total: AtomicUsize,
        done: AtomicUsize,
        finished: AtomicUsize,
    }

    impl ProgressReporter for CountingProgress {
        fn start(&self, total_chunks: usize) {
            self.total.store(total_chunks, Ordering::SeqCst);
        }

        fn chunk_done(&self) {
            self.done.fetch_add(1, Ordering::SeqCst);
        }

        fn finish(&self) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_progress_ticks_once_per_chunk() {
        let mut provider = MockProvider::new(NO_ITEMS);
        provider.add_error("broken");
        let progress = Arc::new(CountingProgress::default());
        let extractor = extractor(provider, 2).with_progress(progress.clone());

        let result = extractor
            .extract(ExtractionRequest::new(
                "one two\n\nbroken chunk\n\nfive six",
                pair_schema(),
            ))
            .await;

        assert_eq!(result.metadata.chunks_failed, 1);
        assert_eq!(progress.total.load(Ordering::SeqCst), 3);
        assert_eq!(progress.done.load(Ordering::SeqCst), 3);
        assert_eq!(progress.finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = test_config(1000);
        config.gateway.max_concurrency = 0;
        let result = Extractor::with_token_counter(
            MockProvider::new(NO_ITEMS),
            config,
            Arc::new(WordCounter),
        );
        assert!(matches!(result, Err(ExtractorError::Config(_))));
    }
}
