//! Выгрузки мошеннических транзакций, доступные по ссылке /exports/{id}

use std::collections::VecDeque;

use axum::body::Bytes;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Ограниченное хранилище в памяти: при переполнении удаляется самая старая выгрузка
pub struct ExportStore {
    capacity: usize,
    entries: Mutex<VecDeque<(Uuid, Bytes)>>,
}

impl ExportStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub async fn insert(&self, data: Vec<u8>) -> Uuid {
        let id = Uuid::new_v4();
        let mut entries = self.entries.lock().await;
        while entries.len() >= self.capacity {
            if let Some((evicted, _)) = entries.pop_front() {
                tracing::debug!(%evicted, "Export evicted");
            }
        }
        entries.push_back((id, Bytes::from(data)));
        id
    }

    pub async fn get(&self, id: &Uuid) -> Option<Bytes> {
        let entries = self.entries.lock().await;
        entries
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, data)| data.clone())
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
