//! Board synchronization service
//!
//! Mirrors every board's card collection into [`BoardsState`] through live
//! store feeds, and translates user intents into minimal batched writes.
//! One feed task per board owns its subscription; the registry aborts them
//! as a unit at shutdown.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::config::StoreConfig;
use crate::models::{board_ids, cards_collection, fields, Card, CardId};
use crate::reorder::{drop_index, resolve_drop, DragState, DropPlan, MoveCard, SiblingCard};
use crate::state::{ActiveCard, BoardsState, Phase};
use crate::store::{CollectionSnapshot, Document, DocumentStore, FieldValue, WriteBatch};
use crate::text::{normalize_card_html, plain_text_to_html};
use crate::{Error, Result};

/// Notice published when connection credentials are absent at startup.
pub const NOT_CONFIGURED_NOTICE: &str =
    "The document store is not configured. Update your environment before running the app.";

/// Synchronizes the fixed board set against the document store and
/// publishes [`BoardsState`] snapshots to the presentation layer.
///
/// Every mutation is guarded: without a store handle, or once a failure
/// notice is up, it logs and returns `Ok(())` without writing. A write the
/// store rejects surfaces to its caller only; local state is not rolled
/// back and the next snapshot reconciles the mirror.
#[derive(Clone)]
pub struct BoardsService {
    store: Option<Arc<dyn DocumentStore>>,
    state: Arc<watch::Sender<BoardsState>>,
    feeds: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl BoardsService {
    /// Service bound to a configured store, starting in [`Phase::Connecting`].
    #[must_use]
    pub fn connect(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_state(Some(store), BoardsState::connecting())
    }

    /// Degraded service without a store. `notice` is published as the
    /// persistent failure and every mutation becomes a guarded no-op.
    #[must_use]
    pub fn unconfigured(notice: impl Into<String>) -> Self {
        Self::with_state(None, BoardsState::failed(notice))
    }

    /// Wire the service from process configuration: a complete
    /// [`StoreConfig`] is handed to `make_store`, any missing credential
    /// falls back to the unconfigured mode.
    pub fn from_env_with(make_store: impl FnOnce(StoreConfig) -> Arc<dyn DocumentStore>) -> Self {
        match StoreConfig::from_env() {
            Ok(config) => Self::connect(make_store(config)),
            Err(error) => {
                tracing::warn!("{error}; data operations disabled");
                Self::unconfigured(NOT_CONFIGURED_NOTICE)
            }
        }
    }

    fn with_state(store: Option<Arc<dyn DocumentStore>>, initial: BoardsState) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            store,
            state: Arc::new(sender),
            feeds: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Receiver of state snapshots for the presentation layer.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<BoardsState> {
        self.state.subscribe()
    }

    /// The latest published snapshot.
    #[must_use]
    pub fn current_state(&self) -> BoardsState {
        self.state.borrow().clone()
    }

    /// Open one live feed per board, replacing feeds from an earlier call
    /// instead of leaking them.
    ///
    /// The first delivered snapshot flips the state to [`Phase::Ready`];
    /// a feed that fails to open publishes the failure and blocks all
    /// mutations. Without a store this is a no-op and the unconfigured
    /// notice stays up.
    pub async fn start(&self) -> Result<()> {
        let Some(store) = self.store.clone() else {
            tracing::warn!("start() without a store; staying in the degraded mode");
            return Ok(());
        };

        let mut feeds = self.feeds.lock().await;
        for feed in feeds.drain(..) {
            feed.abort();
        }
        self.state
            .send_modify(|state| state.phase = Phase::Connecting);

        for board_id in board_ids() {
            let collection = cards_collection(board_id);
            let receiver = match store.subscribe(&collection, fields::ORDER).await {
                Ok(receiver) => receiver,
                Err(error) => {
                    for feed in feeds.drain(..) {
                        feed.abort();
                    }
                    let notice = error.to_string();
                    tracing::warn!("Failed to open the feed for '{board_id}': {notice}");
                    self.state
                        .send_modify(|state| state.phase = Phase::Failed(notice));
                    return Err(error);
                }
            };
            feeds.push(tokio::spawn(run_feed(
                board_id,
                receiver,
                Arc::clone(&self.state),
            )));
        }

        tracing::info!("Watching {} boards", feeds.len());
        Ok(())
    }

    /// Abort every live feed. Idempotent; the state stops updating but the
    /// last snapshot remains readable.
    pub async fn shutdown(&self) {
        let mut feeds = self.feeds.lock().await;
        let stopped = feeds.len();
        for feed in feeds.drain(..) {
            feed.abort();
        }
        if stopped > 0 {
            tracing::info!("Stopped {stopped} board feeds");
        }
    }

    /// Create a card at the end of `board_id` from raw textarea input.
    ///
    /// The text becomes paragraph markup and the card takes the next order
    /// slot on the board. Timestamps come from the store clock so ordering
    /// stays consistent across clients.
    pub async fn add_card(&self, board_id: &str, raw_text: &str) -> Result<()> {
        let Some(store) = self.writable_store() else {
            tracing::warn!("Skipped add_card on '{board_id}'; store unavailable");
            return Ok(());
        };

        let order = self.state.borrow().board_cards(board_id).len();
        let mut payload = Document::new();
        payload.insert(
            fields::BOARD.to_string(),
            FieldValue::Text(board_id.to_string()),
        );
        payload.insert(
            fields::CONTENT.to_string(),
            FieldValue::Text(plain_text_to_html(raw_text)),
        );
        payload.insert(
            fields::ORDER.to_string(),
            FieldValue::Integer(order_value(order)),
        );
        payload.insert(fields::CREATED_AT.to_string(), FieldValue::ServerTimestamp);
        payload.insert(fields::UPDATED_AT.to_string(), FieldValue::ServerTimestamp);

        let id = store.create(&cards_collection(board_id), payload).await?;
        tracing::debug!("Added card '{id}' to '{board_id}' at order {order}");
        Ok(())
    }

    /// Overwrite a card's content, leaving its order untouched.
    ///
    /// Markup that trims to nothing is stored as the placeholder paragraph
    /// so the editor keeps an insertion point.
    pub async fn update_card_content(
        &self,
        board_id: &str,
        card_id: &CardId,
        html: &str,
    ) -> Result<()> {
        let Some(store) = self.writable_store() else {
            tracing::warn!("Skipped update_card_content for '{card_id}'; store unavailable");
            return Ok(());
        };

        let mut payload = Document::new();
        payload.insert(
            fields::CONTENT.to_string(),
            FieldValue::Text(normalize_card_html(html)),
        );
        payload.insert(fields::UPDATED_AT.to_string(), FieldValue::ServerTimestamp);

        let mut batch = WriteBatch::new();
        batch.update(cards_collection(board_id), card_id.as_str(), payload);
        store.commit(batch).await
    }

    /// Remove a card permanently.
    ///
    /// Remaining cards keep their order values; the next reorder or move
    /// on the board closes the gap. Deleting the card open in the editor
    /// also closes the editor.
    pub async fn delete_card(&self, board_id: &str, card_id: &CardId) -> Result<()> {
        if let Some(store) = self.writable_store() {
            let mut batch = WriteBatch::new();
            batch.delete(cards_collection(board_id), card_id.as_str());
            store.commit(batch).await?;
        } else {
            tracing::warn!("Skipped delete_card for '{card_id}'; store unavailable");
        }

        self.state.send_if_modified(|state| {
            let open_here = state
                .editor
                .as_ref()
                .is_some_and(|active| active.card_id == *card_id);
            if open_here {
                state.editor = None;
            }
            open_here
        });
        Ok(())
    }

    /// Persist a full reordered id sequence for one board: every id gets
    /// `order` = its index, in one atomic batch.
    ///
    /// The sequence is trusted to be a permutation of the board's current
    /// ids. An empty sequence is a no-op.
    pub async fn reorder_board(&self, board_id: &str, ordered_ids: &[CardId]) -> Result<()> {
        let Some(store) = self.writable_store() else {
            tracing::warn!("Skipped reorder_board on '{board_id}'; store unavailable");
            return Ok(());
        };
        if ordered_ids.is_empty() {
            return Ok(());
        }

        let collection = cards_collection(board_id);
        let mut batch = WriteBatch::new();
        for (index, card_id) in ordered_ids.iter().enumerate() {
            batch.update(collection.as_str(), card_id.as_str(), order_update(index));
        }

        tracing::debug!("Reordering '{board_id}' across {} cards", ordered_ids.len());
        store.commit(batch).await
    }

    /// Move a card across boards in one atomic batch: delete it from the
    /// source collection, rewrite both boards' order values from the
    /// provided sequences, and recreate its payload in the destination
    /// under the same id.
    ///
    /// A card missing from local state means the drag went stale; nothing
    /// is written.
    pub async fn move_card(&self, request: MoveCard) -> Result<()> {
        let Some(store) = self.writable_store() else {
            tracing::warn!(
                "Skipped move_card for '{}'; store unavailable",
                request.card_id
            );
            return Ok(());
        };

        let moving = self
            .state
            .borrow()
            .card(&request.from_board, &request.card_id)
            .cloned();
        let Some(moving) = moving else {
            tracing::warn!(
                "Ignoring stale move of '{}' from '{}'",
                request.card_id,
                request.from_board
            );
            return Ok(());
        };

        let from_collection = cards_collection(&request.from_board);
        let to_collection = cards_collection(&request.to_board);

        let mut batch = WriteBatch::new();
        batch.delete(from_collection.as_str(), request.card_id.as_str());
        for (index, card_id) in request.next_from_order.iter().enumerate() {
            batch.update(
                from_collection.as_str(),
                card_id.as_str(),
                order_update(index),
            );
        }
        for (index, card_id) in request.next_to_order.iter().enumerate() {
            if *card_id == request.card_id {
                batch.set(
                    to_collection.as_str(),
                    card_id.as_str(),
                    moved_payload(&moving, &request.to_board, index),
                );
            } else {
                batch.update(
                    to_collection.as_str(),
                    card_id.as_str(),
                    order_update(index),
                );
            }
        }

        tracing::debug!(
            "Moving '{}' from '{}' to '{}'",
            request.card_id,
            request.from_board,
            request.to_board
        );
        store.commit(batch).await
    }

    /// Open a card in the rich-text editor.
    pub fn open_card(&self, board_id: &str, card_id: &CardId) {
        self.state.send_modify(|state| {
            state.editor = Some(ActiveCard {
                board_id: board_id.to_string(),
                card_id: card_id.clone(),
            });
        });
    }

    /// Close the editor without saving.
    pub fn close_editor(&self) {
        self.state.send_modify(|state| state.editor = None);
    }

    /// Persist the editor's markup to the open card, then close it.
    ///
    /// A no-op when no editor is open.
    pub async fn save_editor(&self, html: &str) -> Result<()> {
        let active = self.state.borrow().editor.clone();
        let Some(active) = active else {
            return Ok(());
        };

        self.update_card_content(&active.board_id, &active.card_id, html)
            .await?;
        self.close_editor();
        Ok(())
    }

    /// Record the start of a drag gesture.
    pub fn begin_drag(&self, board_id: &str, card_id: &CardId) {
        self.state.send_modify(|state| {
            state.drag = Some(DragState {
                board_id: board_id.to_string(),
                card_id: card_id.clone(),
            });
        });
    }

    /// Clear the drag gesture (drag-end without a drop).
    pub fn end_drag(&self) {
        self.state.send_modify(|state| state.drag = None);
    }

    /// Reconcile a drop on `board_id` at `pointer_y` into writes.
    ///
    /// `siblings` is the target list's card geometry as measured by the
    /// presentation layer; `None` means the list could not be inspected
    /// and the card appends at the end. A drop with no drag in flight does
    /// nothing. The drag state clears whether or not the writes succeed.
    pub async fn drop_on_board(
        &self,
        board_id: &str,
        pointer_y: f64,
        siblings: Option<&[SiblingCard]>,
    ) -> Result<()> {
        let Some(drag) = self.state.borrow().drag.clone() else {
            return Ok(());
        };

        let index = siblings.map_or_else(
            || self.state.borrow().board_cards(board_id).len(),
            |list| drop_index(pointer_y, &drag.card_id, list),
        );
        let plan = resolve_drop(&drag, board_id, index, &self.state.borrow().cards);
        self.end_drag();

        match plan {
            DropPlan::None => Ok(()),
            DropPlan::Reorder {
                board_id,
                ordered_ids,
            } => self.reorder_board(&board_id, &ordered_ids).await,
            DropPlan::Move(request) => self.move_card(request).await,
        }
    }

    /// Store handle, present only while writes are safe: configured and no
    /// process-wide failure published.
    fn writable_store(&self) -> Option<Arc<dyn DocumentStore>> {
        let store = self.store.clone()?;
        if self.state.borrow().phase.is_failed() {
            return None;
        }
        Some(store)
    }
}

/// Consume one board's feed until it closes, mirroring every delivered
/// snapshot into the shared state.
async fn run_feed(
    board_id: &'static str,
    mut feed: watch::Receiver<CollectionSnapshot>,
    state: Arc<watch::Sender<BoardsState>>,
) {
    loop {
        let cards: Vec<Card> = feed
            .borrow_and_update()
            .docs
            .iter()
            .map(|doc| Card::from_snapshot(board_id, doc))
            .collect();

        state.send_modify(|state| {
            state.cards.insert(board_id.to_string(), cards);
            if state.phase == Phase::Connecting {
                state.phase = Phase::Ready;
            }
        });

        if feed.changed().await.is_err() {
            let notice = Error::Subscription(board_id.to_string()).to_string();
            tracing::warn!("{notice}");
            state.send_modify(|state| state.phase = Phase::Failed(notice));
            return;
        }
    }
}

/// Full document for a card landing on `to_board` at `index`: content and
/// creation time carried over, update time refreshed by the store clock.
fn moved_payload(card: &Card, to_board: &str, index: usize) -> Document {
    let mut payload = Document::new();
    payload.insert(
        fields::BOARD.to_string(),
        FieldValue::Text(to_board.to_string()),
    );
    payload.insert(
        fields::CONTENT.to_string(),
        FieldValue::Text(card.content.clone()),
    );
    payload.insert(
        fields::ORDER.to_string(),
        FieldValue::Integer(order_value(index)),
    );
    if let Some(created_at) = card.created_at {
        payload.insert(
            fields::CREATED_AT.to_string(),
            FieldValue::Timestamp(created_at),
        );
    }
    payload.insert(fields::UPDATED_AT.to_string(), FieldValue::ServerTimestamp);
    payload
}

fn order_update(index: usize) -> Document {
    let mut payload = Document::new();
    payload.insert(
        fields::ORDER.to_string(),
        FieldValue::Integer(order_value(index)),
    );
    payload.insert(fields::UPDATED_AT.to_string(), FieldValue::ServerTimestamp);
    payload
}

fn order_value(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}
