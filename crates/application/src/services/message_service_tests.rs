//! 消息门面单元测试

use std::sync::Arc;

use chrono::Duration;
use domain::DomainError;
use uuid::Uuid;

use crate::error::ApplicationError;
use crate::services::test_support::*;
use crate::services::{MessageQuery, MessageService, MessageServiceDependencies};
use crate::Clock;

struct Fixture {
    backend: Arc<InMemoryBackend>,
    clock: Arc<ManualClock>,
    messages: MessageService,
}

fn fixture() -> Fixture {
    let backend = InMemoryBackend::new();
    let clock = Arc::new(ManualClock::new());
    let messages = MessageService::new(MessageServiceDependencies {
        message_repository: Arc::new(Messages(Arc::clone(&backend))),
        clock: Arc::clone(&clock) as Arc<dyn Clock>,
    });
    Fixture {
        backend,
        clock,
        messages,
    }
}

#[tokio::test]
async fn test_create_returns_first_page_view() {
    let fx = fixture();
    let author = seed_user(&fx.backend, "author@example.com").await;
    let room_id = Uuid::new_v4();

    let page = fx
        .messages
        .create(author.id.into(), room_id, "hello there".to_string())
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.result[0].text, "hello there");
    // 返回的是作者的脱敏视图
    assert_eq!(page.result[0].creator.email, "author@example.com");
}

#[tokio::test]
async fn test_create_rejects_blank_text() {
    let fx = fixture();
    let author = seed_user(&fx.backend, "author@example.com").await;

    let result = fx
        .messages
        .create(author.id.into(), Uuid::new_v4(), "   ".to_string())
        .await;
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::InvalidArgument { .. }))
    ));
}

#[tokio::test]
async fn test_find_by_room_filters_case_insensitively() {
    let fx = fixture();
    let author = seed_user(&fx.backend, "author@example.com").await;
    let room_id = Uuid::new_v4();

    fx.messages
        .create(author.id.into(), room_id, "Hello World".to_string())
        .await
        .unwrap();
    fx.clock.advance(Duration::seconds(1));
    fx.messages
        .create(author.id.into(), room_id, "goodbye".to_string())
        .await
        .unwrap();

    let page = fx
        .messages
        .find_by_room(MessageQuery {
            room_id,
            offset: 0,
            limit: 20,
            filter: "hello".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.result[0].text, "Hello World");
}

#[tokio::test]
async fn test_find_by_room_orders_newest_first_and_paginates() {
    let fx = fixture();
    let author = seed_user(&fx.backend, "author@example.com").await;
    let room_id = Uuid::new_v4();

    for text in ["one", "two", "three"] {
        fx.messages
            .create(author.id.into(), room_id, text.to_string())
            .await
            .unwrap();
        fx.clock.advance(Duration::seconds(1));
    }

    let page = fx
        .messages
        .find_by_room(MessageQuery {
            room_id,
            offset: 0,
            limit: 2,
            filter: String::new(),
        })
        .await
        .unwrap();

    assert_eq!(page.total, 3);
    assert_eq!(page.result.len(), 2);
    assert_eq!(page.result[0].text, "three");
    assert_eq!(page.result[1].text, "two");

    let second_page = fx
        .messages
        .find_by_room(MessageQuery {
            room_id,
            offset: 2,
            limit: 2,
            filter: String::new(),
        })
        .await
        .unwrap();
    assert_eq!(second_page.result.len(), 1);
    assert_eq!(second_page.result[0].text, "one");
}

#[tokio::test]
async fn test_update_round_trip_bumps_updated_at() {
    let fx = fixture();
    let author = seed_user(&fx.backend, "author@example.com").await;
    let room_id = Uuid::new_v4();

    let page = fx
        .messages
        .create(author.id.into(), room_id, "draft".to_string())
        .await
        .unwrap();
    let message_id = page.result[0].id;
    let before = page.result[0].updated_at;

    fx.clock.advance(Duration::seconds(30));
    fx.messages
        .update(author.id.into(), message_id, "final".to_string())
        .await
        .unwrap();

    let page = fx
        .messages
        .find_by_room(MessageQuery::first_page(room_id))
        .await
        .unwrap();
    assert_eq!(page.result[0].text, "final");
    // updated_at 严格大于更新前的值
    assert!(page.result[0].updated_at > before);
}

#[tokio::test]
async fn test_update_missing_message_is_not_found() {
    let fx = fixture();
    let author = seed_user(&fx.backend, "author@example.com").await;

    let result = fx
        .messages
        .update(author.id.into(), Uuid::new_v4(), "text".to_string())
        .await;
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::MessageNotFound))
    ));
}

#[tokio::test]
async fn test_update_foreign_message_is_forbidden() {
    let fx = fixture();
    let author = seed_user(&fx.backend, "author@example.com").await;
    let intruder = seed_user(&fx.backend, "intruder@example.com").await;
    let room_id = Uuid::new_v4();

    let page = fx
        .messages
        .create(author.id.into(), room_id, "mine".to_string())
        .await
        .unwrap();

    let result = fx
        .messages
        .update(intruder.id.into(), page.result[0].id, "stolen".to_string())
        .await;
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::NotMessageAuthor))
    ));
}

#[tokio::test]
async fn test_delete_skips_ids_missing_from_room() {
    let fx = fixture();
    let author = seed_user(&fx.backend, "author@example.com").await;
    let room_id = Uuid::new_v4();

    let page = fx
        .messages
        .create(author.id.into(), room_id, "to delete".to_string())
        .await
        .unwrap();
    let owned = page.result[0].id;

    // 不存在的ID只是跳过，整个调用仍然成功
    fx.messages
        .delete(author.id.into(), room_id, &[Uuid::new_v4(), owned])
        .await
        .unwrap();

    assert!(fx.backend.messages.read().await.is_empty());
}

#[tokio::test]
async fn test_delete_aborts_on_first_foreign_message() {
    let fx = fixture();
    let author = seed_user(&fx.backend, "author@example.com").await;
    let other = seed_user(&fx.backend, "other@example.com").await;
    let room_id = Uuid::new_v4();

    let first = fx
        .messages
        .create(author.id.into(), room_id, "mine-1".to_string())
        .await
        .unwrap()
        .result[0]
        .id;
    fx.clock.advance(Duration::seconds(1));
    let foreign = fx
        .messages
        .create(other.id.into(), room_id, "not mine".to_string())
        .await
        .unwrap()
        .result[0]
        .id;
    fx.clock.advance(Duration::seconds(1));
    let page = fx
        .messages
        .create(author.id.into(), room_id, "mine-2".to_string())
        .await
        .unwrap();
    let second = page.result[0].id;

    let result = fx
        .messages
        .delete(author.id.into(), room_id, &[first, foreign, second])
        .await;
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::NotMessageAuthor))
    ));

    // 批量不是事务：越权之前的删除保持已提交，之后的未被处理
    let remaining = fx.backend.messages.read().await;
    let texts: Vec<&str> = remaining.iter().map(|m| m.text.as_str()).collect();
    assert!(!texts.contains(&"mine-1"));
    assert!(texts.contains(&"not mine"));
    assert!(texts.contains(&"mine-2"));
}
