use super::{
    error::StoreError,
    types::{Post, Snapshot},
};
use chrono::Utc;
use std::{
    collections::BTreeMap,
    ffi::OsString,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

pub type SharedStore = Arc<PostStore>;

#[derive(Debug)]
struct StoreState {
    posts: BTreeMap<u64, Post>,
    next_id: u64,
}

impl StoreState {
    fn empty() -> Self {
        Self {
            posts: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            next_id: self.next_id,
            posts: self.posts.values().cloned().collect(),
        }
    }
}

/// Post rows keyed by id.
///
/// Every mutation holds the write lock until the data file (if any) has been
/// rewritten, so a failed write leaves memory and disk in agreement.
#[derive(Debug)]
pub struct PostStore {
    state: RwLock<StoreState>,
    data_file: Option<PathBuf>,
}

impl PostStore {
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(StoreState::empty()),
            data_file: None,
        }
    }

    /// Opens a store backed by `path`, loading existing rows if the file exists.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let state = if tokio::fs::try_exists(&path).await? {
            let json = tokio::fs::read_to_string(&path).await?;
            let snapshot: Snapshot = serde_json::from_str(&json)?;
            let max_id = snapshot.posts.iter().map(|p| p.id).max().unwrap_or(0);

            let state = StoreState {
                next_id: snapshot.next_id.max(max_id + 1),
                posts: snapshot.posts.into_iter().map(|p| (p.id, p)).collect(),
            };
            info!("Loaded {} posts from {:?}", state.posts.len(), path);
            state
        } else {
            info!("Data file {:?} not found, starting with an empty store", path);
            StoreState::empty()
        };

        Ok(Self {
            state: RwLock::new(state),
            data_file: Some(path),
        })
    }

    pub fn data_file(&self) -> Option<&Path> {
        self.data_file.as_deref()
    }

    pub async fn list(&self) -> Vec<Post> {
        let state = self.state.read().await;
        state.posts.values().cloned().collect()
    }

    /// Returns the posts on a 1-based page along with the total row count.
    pub async fn page(&self, page: usize, per_page: usize) -> (Vec<Post>, usize) {
        let state = self.state.read().await;
        let total = state.posts.len();
        let skip = page.saturating_sub(1).saturating_mul(per_page);

        let posts = state
            .posts
            .values()
            .skip(skip)
            .take(per_page)
            .cloned()
            .collect();

        (posts, total)
    }

    pub async fn count(&self) -> usize {
        self.state.read().await.posts.len()
    }

    pub async fn get(&self, id: u64) -> Option<Post> {
        let state = self.state.read().await;
        state.posts.get(&id).cloned()
    }

    pub async fn create(&self, title: String) -> Result<Post, StoreError> {
        let mut state = self.state.write().await;

        let now = Utc::now();
        let post = Post {
            id: state.next_id,
            title,
            created_at: now,
            updated_at: now,
        };
        state.next_id += 1;
        state.posts.insert(post.id, post.clone());

        if let Err(e) = self.persist(&state).await {
            state.posts.remove(&post.id);
            state.next_id -= 1;
            return Err(e);
        }

        debug!("Created post {}", post.id);
        Ok(post)
    }

    /// Replaces the title of post `id`. `updated_at` only moves when the
    /// title actually changes.
    pub async fn update(&self, id: u64, title: String) -> Result<Option<Post>, StoreError> {
        let mut state = self.state.write().await;

        let Some(post) = state.posts.get_mut(&id) else {
            return Ok(None);
        };
        if post.title == title {
            return Ok(Some(post.clone()));
        }

        let previous = post.clone();
        post.title = title;
        post.updated_at = Utc::now();
        let updated = post.clone();

        if let Err(e) = self.persist(&state).await {
            state.posts.insert(id, previous);
            return Err(e);
        }

        debug!("Updated post {}", id);
        Ok(Some(updated))
    }

    /// Removes post `id`, returning whether it existed.
    pub async fn delete(&self, id: u64) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;

        let Some(removed) = state.posts.remove(&id) else {
            return Ok(false);
        };

        if let Err(e) = self.persist(&state).await {
            state.posts.insert(id, removed);
            return Err(e);
        }

        debug!("Deleted post {}", id);
        Ok(true)
    }

    async fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        let Some(path) = &self.data_file else {
            return Ok(());
        };

        let json = serde_json::to_string_pretty(&state.snapshot())?;

        // Write beside the target and rename so readers never see a torn file
        let mut tmp = OsString::from(path.as_os_str());
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;

        Ok(())
    }
}
