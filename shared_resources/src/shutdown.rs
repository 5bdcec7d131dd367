/// ----- SHUTDOWN MODULE -----
/// Process-wide keep-running flag, set from the interrupt handler. The
/// handler is installed without SA_RESTART so blocking accepts and
/// reads return with an interrupted-call error, which loops treat as a
/// shutdown request.

use std::io;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};

static KEEP_RUNNING: AtomicBool = AtomicBool::new(true);

extern "C" fn interrupt_handler(_signal: libc::c_int) {
    KEEP_RUNNING.store(false, Ordering::SeqCst);
}

/// Install the SIGINT handler and ignore SIGPIPE.
pub fn install_handlers() {
    let handler: extern "C" fn(libc::c_int) = interrupt_handler;
    unsafe {
        let mut action: libc::sigaction = mem::zeroed();
        action.sa_sigaction = handler as libc::sighandler_t;
        action.sa_flags = 0;
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(libc::SIGINT, &action, std::ptr::null_mut());
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }
}

pub fn keep_running() -> bool {
    KEEP_RUNNING.load(Ordering::SeqCst)
}

pub fn request_shutdown() {
    KEEP_RUNNING.store(false, Ordering::SeqCst);
}

/// True for errors produced by a signal interrupting a blocking call.
pub fn was_interrupted(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::Interrupted
}
