/// Application name
pub const APP_NAME: &str = "Nexa CRM";

/// Prefix applied to every persisted key.
pub const STORAGE_NAMESPACE: &str = "nexa";

/// Artificial latency of an operator reply, in milliseconds.
pub const SEND_DELAY_MS: u64 = 500;

/// Artificial latency of an AI assistant reply, in milliseconds.
pub const AI_DELAY_MS: u64 = 2_000;

/// Lower bound of the simulator wait between wake-ups, in seconds.
pub const SIMULATOR_MIN_DELAY_SECS: u64 = 30;

/// Upper bound of the simulator wait between wake-ups, in seconds.
pub const SIMULATOR_MAX_DELAY_SECS: u64 = 90;

/// Chance that a simulator wake-up produces an inbound message.
pub const SIMULATOR_MESSAGE_PROBABILITY: f64 = 0.3;

/// Capacity of the notification broadcast channel.
pub const NOTIFICATION_CHANNEL_CAPACITY: usize = 64;

/// Display name used on messages authored by the assistant.
pub const ASSISTANT_NAME: &str = "Assistente IA";

/// Display name used on messages authored by the system (transfers).
pub const SYSTEM_SENDER_NAME: &str = "Sistema";

/// Fallback operator name when a conversation's assignee no longer exists.
pub const FALLBACK_OPERATOR_NAME: &str = "Atendente";

/// Fixed reply produced by the AI assistant.
pub const ASSISTANT_REPLY: &str = "Olá! Sou o assistente de IA da Nexa Automations. Com base no histórico da conversa, posso ajudar com informações sobre nossos produtos, preços e serviços. Por favor, deixe-me saber exatamente o que você precisa saber.";

/// Phrases the simulator picks from when fabricating an inbound message.
pub const SIMULATED_PHRASES: [&str; 10] = [
    "Poderia me enviar mais informações sobre isso?",
    "Qual é o prazo de implementação?",
    "O preço inclui suporte técnico?",
    "Vamos agendar uma reunião para discutir os detalhes?",
    "Precisamos de treinamento para a equipe também.",
    "Isso é compatível com nossos sistemas atuais?",
    "Qual a garantia do serviço?",
    "Vocês atendem no final de semana?",
    "Preciso de uma proposta comercial formalizada.",
    "Podemos fazer uma demonstração para o time?",
];

/// How many entries the dashboard lists show.
pub const DASHBOARD_LIST_LIMIT: usize = 5;

/// Window, in hours, for a conversation to count as recent.
pub const RECENT_CONVERSATION_HOURS: i64 = 24;
