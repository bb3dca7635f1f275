//! Exercises `FileBackedStore` the way a source's `save` callback would:
//! the callback hands its payload off (here, over a channel — a real
//! source would hand it to its own writer thread), and whoever owns the
//! async context commits it through the store.

use ack_persist_state::FileBackedStore;
use ack_ring::Bookmark;
use std::sync::mpsc;

#[tokio::main]
async fn main() {
    let store = FileBackedStore::new(std::env::temp_dir().join("ack-persist-state-demo"));
    store.init().await.expect("store directory is writable");

    let (tx, rx) = mpsc::channel::<[u8; ack_ring::PAYLOAD_LEN]>();

    let mut bookmark = Bookmark::new();
    bookmark.payload_mut()[..4].copy_from_slice(b"0042");
    bookmark.set_save(Box::new(move |payload, _persist_state| {
        let _ = tx.send(*payload);
    }));

    bookmark.save();
    let payload = rx.recv().expect("save callback ran synchronously above");

    let mut write = store.start("position").await.expect("start");
    write.write_all(&payload[..4]).await.expect("write");
    write.commit().await.expect("commit");

    let loaded = store.load("position").await.expect("load");
    println!(
        "committed position: {:?}",
        loaded.map(|b| String::from_utf8_lossy(&b).into_owned())
    );
}
