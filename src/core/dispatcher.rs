use crate::domain::model::{Settings, SubmissionResult, TargetKind};
use crate::domain::ports::SubmissionBackend;
use std::collections::VecDeque;
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};

pub const NO_SUCH_FILE: &str = "No such file or directory";

/// Resolves raw targets into submission units and hands them to a backend.
pub struct SubmissionDispatcher<'a, B: SubmissionBackend + ?Sized> {
    backend: &'a B,
    settings: &'a Settings,
}

impl<'a, B: SubmissionBackend + ?Sized> SubmissionDispatcher<'a, B> {
    pub fn new(backend: &'a B, settings: &'a Settings) -> Self {
        Self { backend, settings }
    }

    /// Nothing is resolved or submitted until the returned iterator is polled.
    pub fn dispatch<I, S>(&self, kind: TargetKind, targets: I) -> Submissions<'a, B>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let targets: Vec<String> = targets.into_iter().map(Into::into).collect();
        tracing::debug!("Dispatching {} {} target(s)", targets.len(), kind);

        Submissions {
            backend: self.backend,
            settings: self.settings,
            kind,
            targets: targets.into_iter(),
            resolved: VecDeque::new(),
            notified: false,
            notify_warning: None,
        }
    }
}

/// One-shot sequence of submission results.
///
/// The backend is notified exactly once: when the sequence runs out, or when
/// the iterator is dropped before that.
pub struct Submissions<'a, B: SubmissionBackend + ?Sized> {
    backend: &'a B,
    settings: &'a Settings,
    kind: TargetKind,
    targets: std::vec::IntoIter<String>,
    resolved: VecDeque<PathBuf>,
    notified: bool,
    notify_warning: Option<String>,
}

impl<'a, B: SubmissionBackend + ?Sized> Submissions<'a, B> {
    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Set when the final notification failed.
    pub fn notify_warning(&self) -> Option<&str> {
        self.notify_warning.as_deref()
    }

    /// Stops early. Remaining targets are skipped, the backend is still notified.
    pub fn finish(&mut self) {
        self.targets = Vec::new().into_iter();
        self.resolved.clear();
        self.notify_once();
    }

    fn notify_once(&mut self) {
        if self.notified {
            return;
        }
        self.notified = true;

        if let Err(e) = self.backend.notify() {
            tracing::debug!("Failed to notify about new submissions: {}", e);
            self.notify_warning = Some(e.to_string());
        }
    }

    fn submit_file(&self, path: &Path) -> SubmissionResult {
        let target = path.display().to_string();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| target.clone());

        match self.backend.submit_file(path, self.settings, &file_name) {
            Ok(analysis_id) => SubmissionResult::submitted(target, analysis_id),
            Err(e) => {
                tracing::debug!("Submission of {} failed: {}", target, e);
                SubmissionResult::failed(target, e.to_string())
            }
        }
    }

    fn submit_url(&self, url: String) -> SubmissionResult {
        match self.backend.submit_url(&url, self.settings) {
            Ok(analysis_id) => SubmissionResult::submitted(url, analysis_id),
            Err(e) => {
                tracing::debug!("Submission of {} failed: {}", url, e);
                SubmissionResult::failed(url, e.to_string())
            }
        }
    }
}

impl<'a, B: SubmissionBackend + ?Sized> Iterator for Submissions<'a, B> {
    type Item = SubmissionResult;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(path) = self.resolved.pop_front() {
                return Some(self.submit_file(&path));
            }

            let Some(raw) = self.targets.next() else {
                self.notify_once();
                return None;
            };

            match self.kind {
                TargetKind::Url => return Some(self.submit_url(raw)),
                TargetKind::File => {
                    let path = PathBuf::from(&raw);
                    if !path.exists() {
                        return Some(SubmissionResult::failed(raw, NO_SUCH_FILE));
                    }
                    match self.backend.enumerate_files(&path) {
                        Ok(files) => self.resolved.extend(files),
                        Err(e) => return Some(SubmissionResult::failed(raw, e.to_string())),
                    }
                }
            }
        }
    }
}

impl<'a, B: SubmissionBackend + ?Sized> FusedIterator for Submissions<'a, B> {}

impl<'a, B: SubmissionBackend + ?Sized> Drop for Submissions<'a, B> {
    fn drop(&mut self) {
        self.notify_once();
    }
}
