#[cfg(test)]
mod tests {
    use crate::message::*;
    use crate::session::*;
    use crate::model::*;
    use crate::event::*;
    use crate::config::*;
    use crate::error::*;
    use crate::notice;
    use serde_json::json;

    fn user(id: &str, text: &str) -> Message {
        Message::user(id, text)
    }

    // ─── Message Tests ───────────────────────────────────────

    #[test]
    fn test_message_user() {
        let msg = Message::user("1", "Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
        assert!(!msg.is_loading);
        assert!(msg.images.is_empty());
        assert!(msg.metadata.is_none());
    }

    #[test]
    fn test_message_placeholder_is_loading() {
        let msg = Message::placeholder("2");
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.content.is_empty());
        assert!(msg.is_loading);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), r#""assistant""#);
    }

    #[test]
    fn test_message_accepts_legacy_type_field() {
        let raw = json!({
            "id": "171-1",
            "type": "assistant",
            "content": "hi",
            "timestamp": "2026-01-01T00:00:00Z",
            "isLoading": false
        });
        let msg: Message = serde_json::from_value(raw).unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, "hi");
    }

    #[test]
    fn test_message_serializes_camel_case() {
        let msg = Message::placeholder("x");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["isLoading"], json!(true));
        assert!(json.get("images").is_none());
    }

    #[test]
    fn test_image_data_not_persisted() {
        let img = MessageImage::new(vec![1, 2, 3], "blob:abc", "image/png");
        let json = serde_json::to_string(&img).unwrap();
        assert!(!json.contains("data"));
        let back: MessageImage = serde_json::from_str(&json).unwrap();
        assert!(back.data.is_empty());
        assert_eq!(back.mime_type, "image/png");
        assert_eq!(back.url, "blob:abc");
    }

    #[test]
    fn test_message_update_streaming_keeps_loading() {
        let mut msg = Message::placeholder("m");
        MessageUpdate::streaming("par").apply(&mut msg);
        assert_eq!(msg.content, "par");
        assert!(msg.is_loading);
    }

    #[test]
    fn test_message_update_finished_sets_metadata() {
        let mut msg = Message::placeholder("m");
        let md = MessageMetadata {
            model: Some("llama3".to_string()),
            processing_time_ms: Some(120),
            token_count: Some(7),
        };
        MessageUpdate::finished("done", Some(md.clone())).apply(&mut msg);
        assert_eq!(msg.content, "done");
        assert!(!msg.is_loading);
        assert_eq!(msg.metadata, Some(md));
    }

    // ─── Session Tests ───────────────────────────────────────

    #[test]
    fn test_session_new() {
        let session = ChatSession::new("llama3");
        assert!(session.id.is_none());
        assert_eq!(session.title, DEFAULT_CHAT_TITLE);
        assert!(session.has_default_title());
        assert!(session.messages.is_empty());
        assert_eq!(session.model, "llama3");
    }

    #[test]
    fn test_session_update_message() {
        let mut session = ChatSession::new("m");
        session.messages.push(Message::placeholder("a"));
        assert!(session.update_message("a", MessageUpdate::streaming("x")));
        assert!(!session.update_message("missing", MessageUpdate::streaming("x")));
        assert_eq!(session.message("a").unwrap().content, "x");
    }

    #[test]
    fn test_session_clear_loading() {
        let mut session = ChatSession::new("m");
        session.messages.push(user("1", "q"));
        session.messages.push(Message::placeholder("2"));
        assert!(session.loading_message().is_some());
        assert_eq!(session.clear_loading(), 1);
        assert!(session.loading_message().is_none());
    }

    #[test]
    fn test_session_average_response_time() {
        let mut session = ChatSession::new("m");
        for (i, ms) in [100u64, 300].iter().enumerate() {
            let mut msg = Message::assistant(i.to_string(), "a");
            msg.metadata = Some(MessageMetadata {
                processing_time_ms: Some(*ms),
                ..Default::default()
            });
            session.messages.push(msg);
        }
        assert_eq!(session.average_response_time_ms(), Some(200));
        session.refresh_metadata();
        assert_eq!(session.metadata.as_ref().unwrap().total_messages, 2);
    }

    #[test]
    fn test_derive_title_long_input_breaks_at_word() {
        let messages = vec![user("1", "Explain closures in JavaScript with a simple example please")];
        let title = derive_title(&messages);
        assert_eq!(title, "Explain closures in JavaScript with a simple...");
        assert!(title.chars().count() <= 50);
    }

    #[test]
    fn test_derive_title_short_input_verbatim() {
        assert_eq!(derive_title(&[user("1", "hi")]), "hi");
    }

    #[test]
    fn test_derive_title_skips_blank_and_assistant() {
        let messages = vec![
            Message::assistant("0", "Welcome"),
            user("1", "   "),
            user("2", "  What is Rust?  "),
        ];
        assert_eq!(derive_title(&messages), "What is Rust?");
    }

    #[test]
    fn test_derive_title_no_user_message() {
        assert_eq!(derive_title(&[]), DEFAULT_CHAT_TITLE);
    }

    #[test]
    fn test_derive_title_without_late_space_cuts_hard() {
        let long = "a".repeat(60);
        let title = derive_title(&[user("1", &long)]);
        assert_eq!(title, format!("{}...", "a".repeat(47)));
    }

    #[test]
    fn test_preview_truncates_at_100_chars() {
        let text = "x".repeat(150);
        let p = preview(&text);
        assert_eq!(p, format!("{}...", "x".repeat(100)));
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn test_stored_chat_roundtrip_through_session() {
        let mut session = ChatSession::new("llama3");
        session.messages.push(user("1", "hello"));
        let stored = StoredChat::from_session(&session, "chat_1".to_string());
        assert_eq!(stored.message_count, 1);
        let back = stored.into_session();
        assert_eq!(back.id.as_deref(), Some("chat_1"));
        assert_eq!(back.messages.len(), 1);
    }

    #[test]
    fn test_chat_summary_from_stored() {
        let mut session = ChatSession::new("m");
        session.messages.push(user("1", "first"));
        session.messages.push(Message::assistant("2", "last reply"));
        let stored = StoredChat::from_session(&session, "c".to_string());
        let summary = ChatSummary::from(&stored);
        assert_eq!(summary.last_message, "last reply");
        assert_eq!(summary.message_count, 2);
        assert!(!summary.starred);
    }

    #[test]
    fn test_chat_summary_empty_chat() {
        let stored = StoredChat::from_session(&ChatSession::new("m"), "c".to_string());
        assert_eq!(ChatSummary::from(&stored).last_message, "No messages");
    }

    // ─── Model Tests ─────────────────────────────────────────

    #[test]
    fn test_model_display_name() {
        let model = ModelInfo {
            name: "llama3-instruct:8b".to_string(),
            size: 0,
            digest: String::new(),
            modified_at: String::new(),
        };
        assert_eq!(model.display_name(), "LLAMA3 INSTRUCT");
    }

    #[test]
    fn test_model_human_size() {
        let mut model = ModelInfo {
            name: "m".to_string(),
            size: 0,
            digest: String::new(),
            modified_at: String::new(),
        };
        assert_eq!(model.human_size(), "0 Bytes");
        model.size = 1536;
        assert_eq!(model.human_size(), "1.5 KB");
        model.size = 4 * 1024 * 1024 * 1024;
        assert_eq!(model.human_size(), "4 GB");
    }

    #[test]
    fn test_vision_model_heuristic() {
        assert!(is_vision_model("llava:13b"));
        assert!(is_vision_model("Llama3.2-Vision"));
        assert!(is_vision_model("moondream"));
        assert!(!is_vision_model("qwen2:7b"));
        assert!(!is_vision_model("phi3"));
    }

    #[test]
    fn test_model_list_deserialization() {
        let raw = r#"{"name":"llama3:latest","size":4661224676,"digest":"abc","modified_at":"2024-05-01T00:00:00Z"}"#;
        let model: ModelInfo = serde_json::from_str(raw).unwrap();
        assert_eq!(model.name, "llama3:latest");
        assert_eq!(model.size, 4661224676);
    }

    #[test]
    fn test_pick_model_preference_order() {
        let models: Vec<ModelInfo> = ["llama3:8b", "mistral:7b", "llava:7b"]
            .iter()
            .map(|name| ModelInfo {
                name: name.to_string(),
                size: 0,
                digest: String::new(),
                modified_at: String::new(),
            })
            .collect();

        assert_eq!(pick_model(&models, Some("llava:7b"), "mistral:7b"), Some("llava:7b"));
        assert_eq!(pick_model(&models, Some("removed:1b"), "mistral:7b"), Some("mistral:7b"));
        assert_eq!(pick_model(&models, None, ""), Some("llama3:8b"));
        assert_eq!(pick_model(&[], Some("llava:7b"), "mistral:7b"), None);
    }

    // ─── Event Tests ─────────────────────────────────────────

    #[test]
    fn test_chat_event_serialization() {
        let event = ChatEvent::GenerationFinished {
            message_id: "m1".to_string(),
            truncated: false,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("GenerationFinished"));
        assert!(json.contains("m1"));
    }

    // ─── Config Tests ────────────────────────────────────────

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.ollama.base_url, "http://localhost:11434");
        assert_eq!(config.ollama.health_check_timeout_ms, 5_000);
        assert_eq!(config.chat.streaming_chunk_size, 2);
        assert!(config.features.streaming);
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn test_merge_config_deep() {
        let base = AppConfig::default();
        let patch = json!({
            "features": { "streaming": false },
            "ollama": { "baseUrl": "http://gpu-box:11434" }
        });
        let merged = merge_config(&base, &patch).unwrap();
        assert!(!merged.features.streaming);
        assert!(merged.features.auto_save, "sibling flags survive the merge");
        assert_eq!(merged.ollama.base_url, "http://gpu-box:11434");
        assert_eq!(merged.ollama.timeout_ms, 30_000);
    }

    #[test]
    fn test_merge_config_arrays_replace() {
        let patch = json!({ "i18n": { "supportedLanguages": ["en", "fr"] } });
        let merged = merge_config(&AppConfig::default(), &patch).unwrap();
        assert_eq!(merged.i18n.supported_languages, vec!["en", "fr"]);
    }

    #[test]
    fn test_merge_config_null_keeps_base() {
        let patch = json!({ "chat": { "defaultModel": null } });
        let merged = merge_config(&AppConfig::default(), &patch).unwrap();
        assert_eq!(merged.chat.default_model, "");
    }

    #[test]
    fn test_merge_config_type_mismatch_is_config_error() {
        let patch = json!({ "chat": { "streamingChunkSize": "many" } });
        let err = merge_config(&AppConfig::default(), &patch).unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));
    }

    #[test]
    fn test_config_missing_sections_use_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"ui":{"defaultTheme":"dark"}}"#).unwrap();
        assert_eq!(config.ui.default_theme, Theme::Dark);
        assert_eq!(config.ui.max_input_length, 4000);
        assert_eq!(config.chat, ChatConfig::default());
    }

    #[test]
    fn test_validate_config_reports_each_violation() {
        let mut config = AppConfig::default();
        config.i18n.default_language = "xx".to_string();
        config.ui.max_input_length = 0;
        config.chat.auto_save_interval_ms = 500;
        config.chat.streaming_chunk_size = 0;
        config.chat.streaming_interval_ms = 10;
        config.ollama.base_url = "localhost".to_string();
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 6, "{:?}", errors);
        assert!(errors[0].contains("Default language"));
    }

    #[test]
    fn test_validate_config_zero_autosave_allowed() {
        let mut config = AppConfig::default();
        config.chat.auto_save_interval_ms = 0;
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn test_rtl_languages() {
        let i18n = I18nConfig::default();
        assert!(i18n.is_rtl("ar"));
        assert!(!i18n.is_rtl("en"));
    }

    // ─── Error Tests ─────────────────────────────────────────

    #[test]
    fn test_error_display() {
        let err = ChatError::Server { status: 500, message: "boom".to_string() };
        assert_eq!(err.to_string(), "Server error: HTTP 500: boom");

        let err = ChatError::Timeout(5000);
        assert_eq!(err.to_string(), "Timeout after 5000ms");

        let err = ChatError::Cancelled;
        assert_eq!(err.to_string(), "Cancelled");

        let err = ChatError::Config(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.to_string(), "Invalid configuration: a; b");
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{{invalid}}").unwrap_err();
        let err: ChatError = serde_err.into();
        assert!(matches!(err, ChatError::Serialization(_)));
    }

    #[test]
    fn test_error_connectivity() {
        assert!(ChatError::Network("down".to_string()).is_connectivity());
        assert!(!ChatError::Cancelled.is_connectivity());
        assert!(!ChatError::Storage("x".to_string()).is_connectivity());
    }

    // ─── Notice Tests ────────────────────────────────────────

    #[test]
    fn test_error_content_has_marker() {
        let content = notice::error_content(&ChatError::Network("refused".to_string()));
        assert!(notice::is_error_content(&content));
        assert!(content.contains("refused"));
    }

    #[test]
    fn test_error_content_special_cases() {
        let not_found = ChatError::Server { status: 404, message: "model".to_string() };
        assert_eq!(notice::error_content(&not_found), notice::MODEL_NOT_FOUND);
        assert_eq!(notice::error_content(&ChatError::Timeout(1)), notice::TIMEOUT_ERROR);
    }
}
