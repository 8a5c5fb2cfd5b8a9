use std::{
    env,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

static CWD_LOCK: Mutex<()> = Mutex::new(());

/// Moves the process into `dir` until dropped. Tests that touch the working directory
/// hold the lock so they never observe each other's directory.
pub(crate) struct CurrentDir {
    previous: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl CurrentDir {
    pub(crate) fn enter(dir: &Path) -> Self {
        let lock = CWD_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = env::current_dir().unwrap();
        env::set_current_dir(dir).unwrap();

        Self {
            previous,
            _lock: lock,
        }
    }
}

impl Drop for CurrentDir {
    fn drop(&mut self) {
        let _ = env::set_current_dir(&self.previous);
    }
}
