mod common;

use common::{
    SYSTEM_PROMPT, ScriptedInteraction, ScriptedProvider, build_loop, session_with, test_config,
    text_reply, tool_reply,
};
use nivuus_core::agent::{ExitReason, LoopState};
use nivuus_core::config::constants::messages;
use nivuus_core::llm::{LLMError, Message, MessageRole};
use nivuus_core::memory::ActionStatus;
use serde_json::{Value, json};
use tempfile::TempDir;

#[tokio::test]
async fn fresh_session_lets_the_model_speak_first() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let session = session_with(&config, Vec::new());
    let provider = ScriptedProvider::new(vec![text_reply("Hello, I checked the host.")]);
    let interaction = ScriptedInteraction::new(&["quit"], true);

    let mut conversation = build_loop(&config, session.clone(), provider.clone(), interaction);
    assert_eq!(conversation.state(), LoopState::CallingModel);

    let reason = conversation.run().await;
    assert_eq!(reason, ExitReason::UserQuit);

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].text(), SYSTEM_PROMPT);
    assert_eq!(transcript[1].text(), "Hello, I checked the host.");

    let saved: Vec<Message> =
        serde_json::from_str(&std::fs::read_to_string(config.storage.history_path()).unwrap())
            .unwrap();
    assert_eq!(saved, transcript);
}

#[tokio::test]
async fn tool_calls_run_before_the_user_is_asked_again() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let session = session_with(&config, Vec::new());
    let provider = ScriptedProvider::new(vec![
        tool_reply(&[(
            "call_1",
            "set_memory_value",
            r#"{"path":"system/info/os","value":"linux"}"#,
        )]),
        text_reply("Stored the OS."),
    ]);
    let interaction = ScriptedInteraction::new(&["exit"], true);

    let mut conversation = build_loop(&config, session.clone(), provider.clone(), interaction);
    assert_eq!(conversation.step().await, LoopState::ExecutingTools);
    assert_eq!(conversation.step().await, LoopState::CallingModel);
    assert_eq!(conversation.step().await, LoopState::AwaitingUser);
    assert_eq!(conversation.step().await, LoopState::Terminated);

    let transcript = session.transcript();
    let roles: Vec<MessageRole> = transcript.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            MessageRole::System,
            MessageRole::Assistant,
            MessageRole::Tool,
            MessageRole::Assistant
        ]
    );
    assert_eq!(transcript[2].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(transcript[2].name.as_deref(), Some("set_memory_value"));

    let os = session.with_memory(|memory| memory.get_value("system.info.os").cloned());
    assert_eq!(os.unwrap(), json!("linux"));

    let log = session.with_memory(|memory| memory.action_log());
    assert!(log.iter().any(|e| e.action_type == "Tool Call Decision"
        && e.status == ActionStatus::Success));
    assert!(log.iter().any(|e| e.action_type == "Tool: set_memory_value"
        && e.status == ActionStatus::Success));

    // The second request carries the memory digest right after the system
    // prompt, but the stored transcript never does.
    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].messages[1].text().starts_with(messages::MEMORY_REMINDER));
    assert!(
        transcript
            .iter()
            .all(|m| !m.text().starts_with(messages::MEMORY_REMINDER))
    );
    assert!(requests[0].tools.as_ref().is_some_and(|tools| !tools.is_empty()));
}

#[tokio::test]
async fn numbered_reply_is_offered_as_choices() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let session = session_with(&config, Vec::new());
    let provider = ScriptedProvider::new(vec![text_reply(
        "What should I look at?\n1. Disk usage\n2. Memory pressure",
    )]);
    let interaction = ScriptedInteraction::new(&["quit"], true);

    let mut conversation = build_loop(&config, session, provider, interaction.clone());
    conversation.run().await;

    assert_eq!(
        interaction.offered_choices(),
        vec![vec!["Disk usage".to_string(), "Memory pressure".to_string()]]
    );
}

#[tokio::test]
async fn empty_input_sends_the_default_instruction() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let session = session_with(
        &config,
        vec![
            Message::system("old prompt".to_string()),
            Message::user("check uptime".to_string()),
            Message::assistant("Up 3 days.".to_string()),
        ],
    );
    let provider = ScriptedProvider::new(vec![text_reply("Nothing else to do.")]);
    let interaction = ScriptedInteraction::new(&["   ", "QUIT"], true);

    let mut conversation = build_loop(&config, session.clone(), provider.clone(), interaction);
    assert_eq!(conversation.state(), LoopState::AwaitingUser);
    assert_eq!(conversation.run().await, ExitReason::UserQuit);

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    let sent = &requests[0].messages;
    assert_eq!(sent[0].text(), SYSTEM_PROMPT);
    assert_eq!(sent.last().unwrap().text(), config.agent.default_instruction);
}

#[tokio::test]
async fn authentication_failure_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let session = session_with(&config, Vec::new());
    let provider = ScriptedProvider::new(vec![Err(LLMError::Authentication(
        "invalid key".to_string(),
    ))]);
    let interaction = ScriptedInteraction::new(&[], true);

    let mut conversation = build_loop(&config, session.clone(), provider, interaction.clone());
    let reason = conversation.run().await;

    assert!(reason.is_fatal());
    assert!(interaction.events().iter().any(|e| e.starts_with("Fatal")));
    let log = session.with_memory(|memory| memory.action_log());
    let last = log.last().unwrap();
    assert_eq!(last.action_type, "System");
    assert_eq!(last.target, "Model API Error: authentication");
    assert_eq!(last.status, ActionStatus::Failure);
}

#[tokio::test]
async fn network_error_is_retried() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let session = session_with(&config, Vec::new());
    let provider = ScriptedProvider::new(vec![
        Err(LLMError::Network("connection reset".to_string())),
        text_reply("Back online."),
    ]);
    let interaction = ScriptedInteraction::new(&["quit"], true);

    let mut conversation = build_loop(&config, session.clone(), provider.clone(), interaction);
    assert_eq!(conversation.step().await, LoopState::CallingModel);
    assert_eq!(conversation.step().await, LoopState::AwaitingUser);
    conversation.run().await;

    assert_eq!(provider.requests().len(), 2);
    let transcript = session.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[1].text(), "Back online.");

    let log = session.with_memory(|memory| memory.action_log());
    assert!(
        log.iter()
            .any(|e| e.action_type == "Network" && e.target == "Model API Error: network")
    );
}

#[tokio::test]
async fn exhausted_retries_discard_the_user_turn() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.agent.max_model_retries = 2;
    let session = session_with(
        &config,
        vec![
            Message::system(SYSTEM_PROMPT.to_string()),
            Message::user("hello".to_string()),
            Message::assistant("Hi.".to_string()),
        ],
    );
    let provider = ScriptedProvider::new(vec![Err(LLMError::RateLimit), Err(LLMError::RateLimit)]);
    let interaction = ScriptedInteraction::new(&["restart nginx", "quit"], true);

    let mut conversation = build_loop(&config, session.clone(), provider.clone(), interaction.clone());
    assert_eq!(conversation.step().await, LoopState::CallingModel);
    assert_eq!(conversation.step().await, LoopState::CallingModel);
    assert_eq!(session.transcript().last().unwrap().text(), "restart nginx");
    assert_eq!(conversation.step().await, LoopState::AwaitingUser);

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[2].text(), "Hi.");
    assert!(interaction.events().iter().any(|e| e.starts_with("Retrying")));

    assert_eq!(conversation.run().await, ExitReason::UserQuit);
}

#[tokio::test]
async fn empty_model_reply_is_recorded_as_api_failure() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let session = session_with(&config, Vec::new());
    let provider = ScriptedProvider::new(vec![text_reply("   "), text_reply("Ready.")]);
    let interaction = ScriptedInteraction::new(&["quit"], true);

    let mut conversation = build_loop(&config, session.clone(), provider, interaction);
    conversation.run().await;

    let log = session.with_memory(|memory| memory.action_log());
    assert!(
        log.iter()
            .any(|e| e.action_type == "API Call" && e.status == ActionStatus::Failure)
    );
    assert_eq!(session.transcript().last().unwrap().text(), "Ready.");
}

#[tokio::test]
async fn closed_input_terminates_and_saves() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let session = session_with(
        &config,
        vec![
            Message::system(SYSTEM_PROMPT.to_string()),
            Message::user("hi".to_string()),
            Message::assistant("Hello.".to_string()),
        ],
    );
    let provider = ScriptedProvider::new(Vec::new());
    let interaction = ScriptedInteraction::new(&[], true);

    let mut conversation = build_loop(&config, session, provider.clone(), interaction);
    assert_eq!(conversation.run().await, ExitReason::InputClosed);
    assert!(provider.requests().is_empty());
    assert!(config.storage.history_path().exists());
    assert!(config.storage.memory_path().exists());
}

#[tokio::test]
async fn long_history_is_compacted_before_the_request() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let mut transcript = vec![Message::system(SYSTEM_PROMPT.to_string())];
    for i in 0..50 {
        transcript.push(Message::user(format!("question {i}")));
        transcript.push(Message::assistant(format!("answer {i}")));
    }
    let session = session_with(&config, transcript);
    let provider = ScriptedProvider::new(vec![text_reply("done")]);
    let interaction = ScriptedInteraction::new(&["one more", "quit"], true);

    let mut conversation = build_loop(&config, session.clone(), provider.clone(), interaction);
    conversation.run().await;

    let sent = &provider.requests()[0].messages;
    assert!(sent.len() <= config.history.max_length);
    assert_eq!(sent[0].role, MessageRole::System);
    assert_eq!(sent[1].text(), format!("{}10 messages", messages::SUMMARY_PREFIX));
    assert_eq!(sent.last().unwrap().text(), "one more");

    let stored = session.transcript();
    assert_eq!(stored.len(), sent.len() + 1);
}

#[tokio::test]
async fn dangling_tool_request_is_dropped_on_start() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let session = session_with(
        &config,
        vec![
            Message::system(SYSTEM_PROMPT.to_string()),
            Message::user("read it".to_string()),
            Message::assistant_with_tools(
                None,
                vec![nivuus_core::llm::ToolCall::function(
                    "call_9".to_string(),
                    "read_file".to_string(),
                    r#"{"filepath":"/etc/hostname"}"#.to_string(),
                )],
            ),
        ],
    );
    let provider = ScriptedProvider::new(Vec::new());
    let interaction = ScriptedInteraction::new(&[], true);

    let conversation = build_loop(&config, session.clone(), provider, interaction);
    assert_eq!(conversation.state(), LoopState::AwaitingUser);
    assert_eq!(session.transcript().len(), 2);

    let saved: Value = serde_json::to_value(session.transcript()).unwrap();
    assert_eq!(saved[1]["role"], "user");
}
