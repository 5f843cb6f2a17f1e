use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

static RAW_MODE: AtomicBool = AtomicBool::new(false);

pub fn raw_mode_active() -> bool {
    RAW_MODE.load(Ordering::Relaxed)
}

fn is_interrupt(code: KeyCode, modifiers: KeyModifiers) -> bool {
    let is_q = code == KeyCode::Char('q');
    let is_ctrl_c = code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL);
    is_q || is_ctrl_c
}

/// Watches the keyboard for 'q' or Ctrl-C until dropped.
pub struct InputHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl InputHandle {
    /// Returns `None` when there is no interactive terminal to listen on.
    pub fn start(on_interrupt: impl FnOnce() + Send + 'static) -> Option<Self> {
        if !console::user_attended() {
            return None;
        }
        if let Err(e) = enable_raw_mode() {
            debug!("Key listener unavailable: {e}");
            return None;
        }
        RAW_MODE.store(true, Ordering::Relaxed);

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let thread = thread::spawn(move || {
            while !stop_flag.load(Ordering::Relaxed) {
                match event::poll(POLL_INTERVAL) {
                    Ok(false) => continue,
                    Ok(true) => {}
                    Err(e) => {
                        debug!("Key listener stopped: {e}");
                        break;
                    }
                }
                if let Ok(Event::Key(key)) = event::read()
                    && key.kind == KeyEventKind::Press
                    && is_interrupt(key.code, key.modifiers)
                {
                    on_interrupt();
                    break;
                }
            }
        });

        Some(Self {
            stop,
            thread: Some(thread),
        })
    }
}

impl Drop for InputHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        let _ = disable_raw_mode();
        RAW_MODE.store(false, Ordering::Relaxed);
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
