//! Built-in workflow templates.

use crate::edge::Edge;
use crate::enums::{ParameterType, RiskLevel, ToolCategory, TriggerType};
use crate::node::{AgentConfig, HandoffConfig, NodeDef, NodeType, ToolConfig, ToolParameter, TriggerConfig};
use crate::workflow::{WorkflowDef, WorkflowSettings};

/// Identifiers of the built-in templates.
pub const TEMPLATE_IDS: &[&str] = &["customer-support", "content-creation"];

/// Look up a built-in template by ID.
pub fn template(id: &str) -> Option<WorkflowDef> {
  match id {
    "customer-support" => Some(customer_support()),
    "content-creation" => Some(content_creation()),
    _ => None,
  }
}

fn default_settings() -> WorkflowSettings {
  WorkflowSettings {
    max_retries: Some(3),
    timeout_ms: Some(300_000),
    step_budget: None,
    failure_policy: None,
  }
}

/// A support agent that can search the knowledge base and open tickets.
pub fn customer_support() -> WorkflowDef {
  let mut def = WorkflowDef::new("customer-support", "Customer Support Agent")
    .settings(default_settings())
    .node(
      NodeDef::new(
        "trigger-1",
        NodeType::Trigger(TriggerConfig {
          trigger_type: TriggerType::Api,
          ..Default::default()
        }),
      )
      .with_name("Customer Inquiry"),
    )
    .node(
      NodeDef::new(
        "agent-1",
        NodeType::Agent(AgentConfig {
          instructions: "You are a helpful customer support agent. Understand the customer's \
                         problem, provide clear solutions and escalate complex issues.\n\
                         Customer message: {{ input.payload.message }}"
            .to_string(),
          model: Some("gpt-4o".to_string()),
          tools: vec!["knowledge_base_search".to_string(), "create_ticket".to_string()],
          temperature: Some(0.3),
          max_tokens: Some(1000),
          ..Default::default()
        }),
      )
      .with_name("Support Agent"),
    )
    .node(
      NodeDef::new(
        "tool-1",
        NodeType::Tool(ToolConfig {
          name: "knowledge_base_search".to_string(),
          description: "Search the knowledge base for relevant articles".to_string(),
          parameters: vec![
            ToolParameter::required("query", ParameterType::String).with_description("Search query"),
          ],
          category: ToolCategory::Data,
          risk_level: RiskLevel::Low,
        }),
      )
      .with_name("knowledge_base_search"),
    )
    .node(
      NodeDef::new(
        "tool-2",
        NodeType::Tool(ToolConfig {
          name: "create_ticket".to_string(),
          description: "Create a support ticket for complex issues".to_string(),
          parameters: vec![
            ToolParameter::required("title", ParameterType::String).with_description("Ticket title"),
            ToolParameter::required("description", ParameterType::String)
              .with_description("Ticket description"),
            ToolParameter::optional("priority", ParameterType::String, Some(serde_json::json!("medium")))
              .with_description("Ticket priority"),
          ],
          category: ToolCategory::Action,
          risk_level: RiskLevel::Medium,
        }),
      )
      .with_name("create_ticket"),
    )
    .edge(Edge::new("trigger-1", "agent-1"))
    .edge(Edge::new("agent-1", "tool-1"))
    .edge(Edge::new("agent-1", "tool-2"));
  def.description = "AI agent for handling customer inquiries and support tickets".to_string();
  def
}

/// A writer agent handing its draft to a reviewer agent.
pub fn content_creation() -> WorkflowDef {
  let mut def = WorkflowDef::new("content-creation", "Content Creation Pipeline")
    .settings(default_settings())
    .node(
      NodeDef::new(
        "trigger-1",
        NodeType::Trigger(TriggerConfig {
          trigger_type: TriggerType::Manual,
          ..Default::default()
        }),
      )
      .with_name("Content Request"),
    )
    .node(
      NodeDef::new(
        "agent-1",
        NodeType::Agent(AgentConfig {
          instructions: "You are a professional content writer. Write engaging, well-structured \
                         content about: {{ input.payload.topic }}"
            .to_string(),
          model: Some("gpt-4o".to_string()),
          tools: vec!["research_tool".to_string()],
          temperature: Some(0.7),
          max_tokens: Some(2000),
          handoffs: vec!["review".to_string()],
          ..Default::default()
        }),
      )
      .with_name("Content Writer"),
    )
    .node(
      NodeDef::new(
        "handoff-1",
        NodeType::Handoff(HandoffConfig {
          condition: Some("content_ready".to_string()),
          preserve_context: false,
          ..HandoffConfig::new("agent-1", "agent-2")
        }),
      )
      .with_name("Writer to Reviewer"),
    )
    .node(
      NodeDef::new(
        "agent-2",
        NodeType::Agent(AgentConfig {
          instructions: "You are a content reviewer and editor. Review the provided content for \
                         grammar, clarity, accuracy and tone, and give specific feedback."
            .to_string(),
          model: Some("gpt-4o".to_string()),
          temperature: Some(0.3),
          max_tokens: Some(1500),
          ..Default::default()
        }),
      )
      .with_name("Content Reviewer"),
    )
    .node(
      NodeDef::new(
        "tool-1",
        NodeType::Tool(ToolConfig {
          name: "research_tool".to_string(),
          description: "Research information on a given topic".to_string(),
          parameters: vec![
            ToolParameter::required("topic", ParameterType::String).with_description("Research topic"),
            ToolParameter::optional("sources", ParameterType::String, Some(serde_json::json!("web")))
              .with_description("Research sources"),
          ],
          category: ToolCategory::Data,
          risk_level: RiskLevel::Low,
        }),
      )
      .with_name("research_tool"),
    )
    .edge(Edge::new("trigger-1", "agent-1"))
    .edge(Edge::new("agent-1", "tool-1"))
    .edge(Edge::from_port("agent-1", "review", "handoff-1"))
    .edge(Edge::new("handoff-1", "agent-2"));
  def.description = "Multi-agent workflow for creating and reviewing content".to_string();
  def
}
