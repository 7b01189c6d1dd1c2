//! First-run sample data.
//!
//! Each collection is seeded independently and only when its stored document
//! is empty, so [`ensure_seeded`] is idempotent. Later collections reference
//! the ids of earlier ones: users first, then conversations, messages, tasks
//! and deals.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use nexa_shared::constants::{ASSISTANT_NAME, FALLBACK_OPERATOR_NAME};
use nexa_shared::types::{
    AiStatus, ConversationId, ConversationStatus, DealId, DealStage, MessageSender, Role, TaskId,
    TaskPriority, TaskStatus, UserId,
};
use nexa_shared::CrmError;

use crate::models::{Conversation, Deal, Message, RelatedTo, Task, User};
use crate::storage::{Storage, StorageKey};

/// Every seeded (or already present) collection.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedData {
    pub users: Vec<User>,
    pub conversations: Vec<Conversation>,
    pub messages: Vec<Message>,
    pub tasks: Vec<Task>,
    pub deals: Vec<Deal>,
}

pub fn ensure_seeded(storage: &Storage) -> Result<SeedData, CrmError> {
    ensure_seeded_at(storage, Utc::now())
}

/// Same as [`ensure_seeded`] with an explicit clock for relative timestamps.
pub fn ensure_seeded_at(storage: &Storage, now: DateTime<Utc>) -> Result<SeedData, CrmError> {
    let users = seed_users(storage);
    let conversations = seed_conversations(storage, &users, now)?;
    let messages = seed_messages(storage, &conversations, &users);
    let tasks = seed_tasks(storage, &users, &conversations, now)?;
    let deals = seed_deals(storage, &users, now)?;

    Ok(SeedData {
        users,
        conversations,
        messages,
        tasks,
        deals,
    })
}

/// Returns the stored collection if it is non-empty, otherwise builds,
/// stores and returns a fresh one.
fn existing_or<T, F>(storage: &Storage, key: StorageKey, build: F) -> Result<Vec<T>, CrmError>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
    F: FnOnce() -> Result<Vec<T>, CrmError>,
{
    let existing: Vec<T> = storage.get(key, Vec::new());
    if !existing.is_empty() {
        return Ok(existing);
    }

    let seeded = build()?;
    tracing::info!(key = %key.as_key(), count = seeded.len(), "seeded collection");
    storage.set(key, &seeded);
    Ok(seeded)
}

/// Admin and agents, or the precondition error naming `what` was being seeded.
fn staff<'a>(users: &'a [User], what: &'static str) -> Result<(&'a User, Vec<&'a User>), CrmError> {
    let admin = users
        .iter()
        .find(|u| u.role == Role::Admin)
        .ok_or(CrmError::SeedPrecondition(what))?;
    let agents: Vec<&User> = users.iter().filter(|u| u.role == Role::Agent).collect();
    if agents.is_empty() {
        return Err(CrmError::SeedPrecondition(what));
    }
    Ok((admin, agents))
}

fn avatar(name: &str, background: &str) -> Option<String> {
    Some(format!(
        "https://ui-avatars.com/api/?name={}&background={background}&color=fff",
        name.replace(' ', "+")
    ))
}

pub fn seed_users(storage: &Storage) -> Vec<User> {
    let build = || {
        let user = |name: &str, email: &str, role: Role, background: &str| User {
            id: UserId::new(),
            name: name.to_string(),
            email: email.to_string(),
            role,
            avatar_url: avatar(name, background),
            password: None,
        };
        Ok(vec![
            user("Admin User", "admin@nexaautomations.com", Role::Admin, "0D8ABC"),
            user("Maria Silva", "maria@nexaautomations.com", Role::Agent, "2563EB"),
            user("João Santos", "joao@nexaautomations.com", Role::Agent, "2563EB"),
        ])
    };
    existing_or(storage, StorageKey::Users, build).unwrap_or_default()
}

pub fn seed_conversations(
    storage: &Storage,
    users: &[User],
    now: DateTime<Utc>,
) -> Result<Vec<Conversation>, CrmError> {
    existing_or(storage, StorageKey::Conversations, || {
        let (admin, agents) = staff(users, "conversations")?;
        let agent = |i: usize| agents[i % agents.len()].id.clone();

        let rows = [
            ("Roberto Almeida", "roberto@empresa.com.br", "(11) 98765-4321", ConversationStatus::Active, AiStatus::Active, 2, 10, agent(0), "Preciso saber mais sobre a integração com nosso ERP."),
            ("Carla Mendes", "carla@techsolutions.com.br", "(21) 99876-5432", ConversationStatus::Pending, AiStatus::Paused, 0, 120, agent(1), "Vou analisar a proposta e retorno em breve."),
            ("Marcos Oliveira", "marcos@bigcorp.com.br", "(31) 98765-1234", ConversationStatus::Closed, AiStatus::Manual, 0, 1440, agent(0), "Obrigado pelo excelente atendimento. Já assinamos o contrato."),
            ("Luciana Costa", "luciana@startupnova.com", "(41) 99988-7766", ConversationStatus::Active, AiStatus::Active, 1, 45, agent(1), "Quando podemos agendar uma demonstração?"),
            ("Fernando Gomes", "fernando@industria.com.br", "(51) 98877-6655", ConversationStatus::Active, AiStatus::Paused, 3, 5, admin.id.clone(), "Estou com problemas no sistema. Podem me ajudar?"),
            ("Amanda Reis", "amanda@consulta.com.br", "(61) 99123-4567", ConversationStatus::Pending, AiStatus::Manual, 0, 240, agent(0), "Aguardo o envio dos documentos para prosseguirmos."),
        ];

        Ok(rows
            .into_iter()
            .map(
                |(name, email, phone, status, ai_status, unread, minutes_ago, assignee, last)| {
                    Conversation {
                        id: ConversationId::new(),
                        contact_name: name.to_string(),
                        contact_email: email.to_string(),
                        contact_phone: Some(phone.to_string()),
                        status,
                        ai_status,
                        unread_count: unread,
                        last_message: last.to_string(),
                        last_message_time: now - Duration::minutes(minutes_ago),
                        assigned_to_id: assignee,
                    }
                },
            )
            .collect())
    })
}

/// The opening exchange is placed before each conversation's last message so
/// that the stored `lastMessage` stays the chronologically last one.
pub fn seed_messages(storage: &Storage, conversations: &[Conversation], users: &[User]) -> Vec<Message> {
    let build = || {
        let mut messages = Vec::new();
        for conv in conversations {
            let operator = users
                .iter()
                .find(|u| u.id == conv.assigned_to_id)
                .map(|u| u.name.as_str())
                .unwrap_or(FALLBACK_OPERATOR_NAME);
            let before = |minutes: i64| conv.last_message_time - Duration::minutes(minutes);
            let contact = conv.contact_name.as_str();

            messages.push(Message::new(
                conv.id.clone(),
                MessageSender::Contact,
                contact,
                format!("Olá, sou {contact} da empresa e gostaria de saber mais sobre os serviços da Nexa Automations."),
                before(180),
                true,
            ));
            messages.push(Message::new(
                conv.id.clone(),
                MessageSender::Operator,
                operator,
                format!("Olá {contact}, sou {operator} da Nexa Automations. Como posso ajudar você hoje?"),
                before(175),
                true,
            ));
            if conv.ai_status == AiStatus::Active {
                messages.push(Message::new(
                    conv.id.clone(),
                    MessageSender::Assistant,
                    ASSISTANT_NAME,
                    format!("Olá {contact}, sou o assistente de IA da Nexa Automations. Estou aqui para auxiliar com informações sobre nossos produtos e serviços. {operator} também está acompanhando nossa conversa."),
                    before(174),
                    true,
                ));
            }
            messages.push(Message::new(
                conv.id.clone(),
                MessageSender::Contact,
                contact,
                conv.last_message.clone(),
                conv.last_message_time,
                conv.unread_count == 0,
            ));
        }
        Ok(messages)
    };
    existing_or(storage, StorageKey::Messages, build).unwrap_or_default()
}

pub fn seed_tasks(
    storage: &Storage,
    users: &[User],
    conversations: &[Conversation],
    now: DateTime<Utc>,
) -> Result<Vec<Task>, CrmError> {
    existing_or(storage, StorageKey::Tasks, || {
        let (admin, agents) = staff(users, "tasks")?;
        let agent = |i: usize| agents[i % agents.len()].id.clone();
        let about = |i: usize| conversations.get(i).map(|c| RelatedTo::Conversation(c.id.clone()));

        let rows = [
            ("Enviar material sobre integração ERP", "Preparar e enviar documentação técnica sobre API de integração com sistemas ERP", 2, TaskStatus::Todo, TaskPriority::High, agent(0), about(0)),
            ("Agendar demonstração", "Agendar call para demonstração do produto para a Startup Nova", 5, TaskStatus::InProgress, TaskPriority::Medium, agent(1), about(3)),
            ("Resolver problema técnico", "Investigar e resolver problema reportado pelo cliente Fernando da Indústria", 1, TaskStatus::Todo, TaskPriority::High, admin.id.clone(), about(4)),
            ("Preparar renovação de contrato", "Revisar e preparar documentos para renovação de contrato trimestral", 10, TaskStatus::Todo, TaskPriority::Medium, admin.id.clone(), None),
            ("Seguir com lead Techsolutions", "Entrar em contato para verificar feedback sobre a proposta", 3, TaskStatus::Todo, TaskPriority::Medium, agent(1), about(1)),
        ];

        Ok(rows
            .into_iter()
            .map(|(title, description, days, status, priority, assignee, related_to)| Task {
                id: TaskId::new(),
                title: title.to_string(),
                description: description.to_string(),
                due_date: now + Duration::days(days),
                status,
                priority,
                assigned_to_id: assignee,
                related_to,
            })
            .collect())
    })
}

pub fn seed_deals(storage: &Storage, users: &[User], now: DateTime<Utc>) -> Result<Vec<Deal>, CrmError> {
    existing_or(storage, StorageKey::Deals, || {
        let (admin, agents) = staff(users, "deals")?;
        let agent = |i: usize| agents[i % agents.len()].id.clone();

        let rows = [
            ("Implantação Sistema CRM", 15_000, "Empresa SA", "Roberto Almeida", "roberto@empresa.com.br", DealStage::Proposal, 15, 2, agent(0)),
            ("Consultoria Automação", 7_500, "TechSolutions", "Carla Mendes", "carla@techsolutions.com.br", DealStage::Lead, 7, 1, agent(1)),
            ("Licença Software Anual", 25_000, "BigCorp", "Marcos Oliveira", "marcos@bigcorp.com.br", DealStage::Closed, 30, 5, agent(0)),
            ("Pacote Treinamento", 5_000, "StartupNova", "Luciana Costa", "luciana@startupnova.com", DealStage::Lead, 10, 1, agent(1)),
            ("Integração Sistemas", 35_000, "Indústria LTDA", "Fernando Gomes", "fernando@industria.com.br", DealStage::Proposal, 20, 3, admin.id.clone()),
            ("Suporte Premium", 12_000, "Consulta SA", "Amanda Reis", "amanda@consulta.com.br", DealStage::Lead, 5, 1, agent(0)),
        ];

        Ok(rows
            .into_iter()
            .map(
                |(title, value, company, contact, email, stage, created_days, updated_days, assignee)| Deal {
                    id: DealId::new(),
                    title: title.to_string(),
                    value: Decimal::new(value, 0),
                    company: company.to_string(),
                    contact_name: contact.to_string(),
                    contact_email: email.to_string(),
                    stage,
                    created_at: now - Duration::days(created_days),
                    updated_at: now - Duration::days(updated_days),
                    assigned_to_id: assignee,
                },
            )
            .collect())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_one_admin_and_some_agents() {
        let storage = Storage::in_memory();
        let data = ensure_seeded(&storage).unwrap();

        assert_eq!(data.users.iter().filter(|u| u.role == Role::Admin).count(), 1);
        assert!(data.users.iter().any(|u| u.role == Role::Agent));
        assert_eq!(data.conversations.len(), 6);
        assert_eq!(data.tasks.len(), 5);
        assert_eq!(data.deals.len(), 6);
    }

    #[test]
    fn second_call_changes_nothing() {
        let storage = Storage::in_memory();
        let first = ensure_seeded(&storage).unwrap();
        let raw_before: Vec<_> = StorageKey::ALL.iter().map(|k| storage.raw(*k)).collect();

        let second = ensure_seeded(&storage).unwrap();
        let raw_after: Vec<_> = StorageKey::ALL.iter().map(|k| storage.raw(*k)).collect();

        assert_eq!(first, second);
        assert_eq!(raw_before, raw_after);
    }

    #[test]
    fn conversations_require_users() {
        let storage = Storage::in_memory();
        let err = seed_conversations(&storage, &[], Utc::now()).unwrap_err();
        assert_eq!(err, CrmError::SeedPrecondition("conversations"));
        assert!(storage.raw(StorageKey::Conversations).is_none());
    }

    #[test]
    fn last_message_cache_matches_newest_seeded_message() {
        let storage = Storage::in_memory();
        let data = ensure_seeded(&storage).unwrap();

        for conv in &data.conversations {
            let newest = data
                .messages
                .iter()
                .filter(|m| m.conversation_id == conv.id)
                .max_by_key(|m| m.timestamp)
                .unwrap();
            assert_eq!(newest.content, conv.last_message);
            assert_eq!(newest.timestamp, conv.last_message_time);
        }
    }

    #[test]
    fn unread_seed_messages_follow_unread_counter() {
        let storage = Storage::in_memory();
        let data = ensure_seeded(&storage).unwrap();

        for conv in &data.conversations {
            let unread = data
                .messages
                .iter()
                .filter(|m| m.conversation_id == conv.id && !m.is_read)
                .count();
            assert_eq!(unread > 0, conv.unread_count > 0);
        }
    }

    #[test]
    fn seeded_tasks_reference_seeded_conversations() {
        let storage = Storage::in_memory();
        let data = ensure_seeded(&storage).unwrap();

        for task in &data.tasks {
            if let Some(RelatedTo::Conversation(id)) = &task.related_to {
                assert!(data.conversations.iter().any(|c| &c.id == id));
            }
        }
    }
}
