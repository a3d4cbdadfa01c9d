use agentspace_core::{group_messages, ContentPart, Message, MessageBlock, Role, Source};
use pretty_assertions::assert_eq;

fn agent(agent_id: &str, content: Option<&str>, file_id: Option<&str>) -> Message {
    Message {
        role: Role::Assistant,
        source: Some(Source::Agent),
        agent_id: Some(agent_id.to_string()),
        provider_url: Some(format!("https://{agent_id}.example.com")),
        content_type: Some("text".to_string()),
        content: content.map(str::to_string),
        file_id: file_id.map(str::to_string),
    }
}

fn platform(content: &str) -> Message {
    Message {
        role: Role::Assistant,
        source: Some(Source::Platform),
        agent_id: None,
        provider_url: None,
        content_type: Some("text".to_string()),
        content: Some(content.to_string()),
        file_id: None,
    }
}

#[test]
fn consecutive_entries_of_one_agent_share_a_block() {
    let messages = vec![
        Message::user("draw a cat"),
        agent("A", Some("Here"), None),
        agent("A", None, Some("file-1")),
        agent("A", Some("done"), None),
        agent("B", Some("second opinion"), None),
    ];

    assert_eq!(
        group_messages(&messages),
        vec![
            MessageBlock::User {
                text: "draw a cat".to_string(),
                file_id: None,
            },
            MessageBlock::AgentGroup {
                agent_id: "A".to_string(),
                provider_url: Some("https://A.example.com".to_string()),
                parts: vec![
                    ContentPart::Text("Here".to_string()),
                    ContentPart::File("file-1".to_string()),
                    ContentPart::Text("done".to_string()),
                ],
            },
            MessageBlock::AgentGroup {
                agent_id: "B".to_string(),
                provider_url: Some("https://B.example.com".to_string()),
                parts: vec![ContentPart::Text("second opinion".to_string())],
            },
        ]
    );
}

#[test]
fn platform_entry_breaks_an_agent_group() {
    let messages = vec![
        agent("A", Some("one"), None),
        platform("interlude"),
        agent("A", Some("two"), None),
    ];

    let blocks = group_messages(&messages);

    assert_eq!(blocks.len(), 3);
    assert_eq!(
        blocks[1],
        MessageBlock::Assistant {
            source: Some(Source::Platform),
            text: Some("interlude".to_string()),
            file_id: None,
        }
    );
}

#[test]
fn empty_parts_are_left_out_of_a_group() {
    let messages = vec![
        agent("A", Some(""), None),
        agent("A", None, Some("")),
        agent("A", Some("x"), None),
    ];

    assert_eq!(
        group_messages(&messages),
        vec![MessageBlock::AgentGroup {
            agent_id: "A".to_string(),
            provider_url: Some("https://A.example.com".to_string()),
            parts: vec![ContentPart::Text("x".to_string())],
        }]
    );
}

#[test]
fn agent_entry_without_id_stands_alone() {
    let mut anonymous = agent("A", Some("who am I"), None);
    anonymous.agent_id = None;
    let messages = vec![anonymous.clone(), anonymous];

    let blocks = group_messages(&messages);

    assert_eq!(blocks.len(), 2);
    assert!(blocks
        .iter()
        .all(|block| matches!(block, MessageBlock::Assistant { .. })));
}

#[test]
fn notice_renders_as_a_plain_assistant_block() {
    let messages = vec![Message::user("hi"), Message::notice("Request failed")];

    assert_eq!(
        group_messages(&messages)[1],
        MessageBlock::Assistant {
            source: None,
            text: Some("Request failed".to_string()),
            file_id: None,
        }
    );
}
