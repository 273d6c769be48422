use std::{
    path::{Path, PathBuf},
    sync::{
        mpsc::{self, Receiver, Sender},
        Mutex, MutexGuard, PoisonError,
    },
};

pub const DIALOG_TITLE: &str = "Select Directory";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickerTicket(u64);

#[derive(Debug, Default)]
struct SlotState {
    generation: u64,
    pending: Option<(u64, Sender<String>)>,
}

#[derive(Debug, Default)]
pub struct DirectoryPickerSlot {
    state: Mutex<SlotState>,
}

impl DirectoryPickerSlot {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn begin(&self) -> (PickerTicket, Receiver<String>) {
        let (sender, receiver) = mpsc::channel();
        let mut state = self.lock();
        state.generation += 1;
        let generation = state.generation;
        if let Some((_, superseded)) = state.pending.replace((generation, sender)) {
            let _ = superseded.send(String::new());
        }
        (PickerTicket(generation), receiver)
    }

    pub fn complete(&self, ticket: PickerTicket, selection: Option<PathBuf>) -> bool {
        let mut state = self.lock();
        match state.pending.take() {
            Some((generation, sender)) if generation == ticket.0 => {
                let value = selection
                    .map(|path| path.to_string_lossy().to_string())
                    .unwrap_or_default();
                let _ = sender.send(value);
                true
            }
            other => {
                state.pending = other;
                false
            }
        }
    }
}

pub fn resolve_default_directory(
    requested: Option<&str>,
    documents_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    requested
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
        .or(documents_dir)
}

pub fn dialog_start_directory(default_path: &Path) -> PathBuf {
    if default_path.is_file() {
        default_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_path.to_path_buf())
    } else {
        default_path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_request_receives_selection() {
        let slot = DirectoryPickerSlot::default();
        let (ticket, receiver) = slot.begin();
        assert!(slot.complete(ticket, Some(PathBuf::from("/tmp/out"))));
        assert_eq!(receiver.recv().expect("selection"), "/tmp/out");
    }

    #[test]
    fn cancelled_request_receives_empty_string() {
        let slot = DirectoryPickerSlot::default();
        let (ticket, receiver) = slot.begin();
        assert!(slot.complete(ticket, None));
        assert_eq!(receiver.recv().expect("cancel result"), "");
    }

    #[test]
    fn newer_request_supersedes_pending_one() {
        let slot = DirectoryPickerSlot::default();
        let (first_ticket, first) = slot.begin();
        let (second_ticket, second) = slot.begin();

        assert_eq!(first.recv().expect("superseded result"), "");
        assert!(!slot.complete(first_ticket, Some(PathBuf::from("/stale"))));
        assert!(slot.complete(second_ticket, Some(PathBuf::from("/fresh"))));
        assert_eq!(second.recv().expect("fresh result"), "/fresh");
    }

    #[test]
    fn default_directory_prefers_non_blank_request() {
        let documents = Some(PathBuf::from("/home/u/Documents"));
        assert_eq!(
            resolve_default_directory(Some(" /data "), documents.clone()),
            Some(PathBuf::from("/data"))
        );
        assert_eq!(
            resolve_default_directory(Some("   "), documents.clone()),
            documents
        );
        assert_eq!(resolve_default_directory(None, None), None);
    }
}
