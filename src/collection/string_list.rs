//! Include or exclude list of a collection, edited as strings.

use tracing::debug;

use super::data::{Binding, SharedBinding};
use super::{CollectionApi, Signal};
use crate::core::{Listen, Subscription};
use crate::host::{CollectionContext, MessageType};
use crate::util::{Result, ScenePath};

/// Ordered, duplicate-free path list backing a collection's includes or
/// excludes. Obtained from
/// [`CollectionData::include_data`](super::CollectionData::include_data) or
/// `exclude_data`.
///
/// The view follows its `CollectionData`: after a rebind it reads and edits
/// the new collection. Edits return whether the stored list changed. Strings
/// that are not valid paths are reported as errors and nothing is written.
pub struct CollectionStringListData {
    ctx: CollectionContext,
    binding: SharedBinding,
    include: bool,
    data_changed: Signal,
}

impl CollectionStringListData {
    pub(crate) fn new(
        ctx: CollectionContext,
        binding: SharedBinding,
        include: bool,
        data_changed: Signal,
    ) -> Self {
        Self {
            ctx,
            binding,
            include,
            data_changed,
        }
    }

    /// True for the includes list, false for excludes.
    pub fn is_include(&self) -> bool {
        self.include
    }

    fn binding(&self) -> Option<Binding> {
        self.binding.read().clone()
    }

    fn list_name(&self) -> &'static str {
        if self.include {
            "includes"
        } else {
            "excludes"
        }
    }

    fn read(&self, api: &CollectionApi<'_>) -> Vec<ScenePath> {
        if self.include {
            api.includes()
        } else {
            api.excludes()
        }
    }

    fn write(&self, api: &CollectionApi<'_>, paths: Vec<ScenePath>) -> Result<()> {
        if self.include {
            api.set_includes(paths)
        } else {
            api.set_excludes(paths)
        }
    }

    pub fn get_paths(&self) -> Vec<ScenePath> {
        self.binding()
            .and_then(|b| b.with_api(|api| self.read(api)))
            .unwrap_or_default()
    }

    pub fn get_strings(&self) -> Vec<String> {
        self.get_paths().into_iter().map(String::from).collect()
    }

    fn parse_all<S: AsRef<str>>(&self, strings: &[S]) -> Option<Vec<ScenePath>> {
        let mut out = Vec::with_capacity(strings.len());
        for s in strings {
            match ScenePath::parse(s.as_ref()) {
                Ok(path) => out.push(path),
                Err(err) => {
                    self.ctx
                        .report(&format!("Invalid path: {}", err), MessageType::Error);
                    return None;
                }
            }
        }
        Some(out)
    }

    /// Write `edit(current)` if it differs from the current list.
    fn update<F>(&self, edit: F) -> bool
    where
        F: FnOnce(Vec<ScenePath>) -> Vec<ScenePath>,
    {
        let Some(binding) = self.binding() else {
            return false;
        };
        let result = binding.with_api(|api| -> Result<bool> {
            let current = self.read(api);
            let next = edit(current.clone());
            if next == current {
                return Ok(false);
            }
            self.write(api, next)?;
            Ok(true)
        });
        match result {
            Some(Ok(changed)) => changed,
            Some(Err(err)) => {
                self.ctx.report(
                    &format!("Failed to update the {} of {}: {}", self.list_name(), binding.name, err),
                    MessageType::Error,
                );
                false
            }
            None => false,
        }
    }

    /// Replace the whole list. Duplicates keep their first position.
    pub fn set_strings<S: AsRef<str>>(&self, strings: &[S]) -> bool {
        let Some(paths) = self.parse_all(strings) else {
            return false;
        };
        self.update(|_| dedup(paths))
    }

    /// Append paths not already present.
    pub fn add_strings<S: AsRef<str>>(&self, strings: &[S]) -> bool {
        let Some(paths) = self.parse_all(strings) else {
            return false;
        };
        self.update(|mut current| {
            current.extend(paths);
            dedup(current)
        })
    }

    pub fn remove_strings<S: AsRef<str>>(&self, strings: &[S]) -> bool {
        let Some(paths) = self.parse_all(strings) else {
            return false;
        };
        self.update(|mut current| {
            current.retain(|p| !paths.contains(p));
            current
        })
    }

    /// Replace `old` with `new` in place. If `new` is already listed, `old`
    /// is just removed.
    pub fn replace_strings(&self, old: &str, new: &str) -> bool {
        let Some(mut paths) = self.parse_all(&[old, new]) else {
            return false;
        };
        let (Some(new), Some(old)) = (paths.pop(), paths.pop()) else {
            return false;
        };
        debug!(%old, %new, list = self.list_name(), "replacing collection path");
        self.update(|current| {
            let replaced = current
                .into_iter()
                .map(|p| if p == old { new.clone() } else { p })
                .collect();
            dedup(replaced)
        })
    }

    /// Fires once per stage notice that touched this list.
    pub fn connect_data_changed<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.data_changed.subscribe(move |_| {
            callback();
            Listen::Keep
        })
    }

    pub fn signal(&self) -> &Signal {
        &self.data_changed
    }
}

fn dedup(paths: Vec<ScenePath>) -> Vec<ScenePath> {
    let mut out: Vec<ScenePath> = Vec::with_capacity(paths.len());
    for path in paths {
        if !out.contains(&path) {
            out.push(path);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::super::CollectionData;
    use super::*;
    use crate::core::Stage;
    use crate::host::{MemoryReporter, Settings};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn setup() -> (Arc<Stage>, Arc<MemoryReporter>, CollectionData) {
        let stage = Stage::new();
        let prim = stage.define_prim(&"/World".parse().unwrap()).unwrap();
        let reporter = Arc::new(MemoryReporter::new());
        let ctx = CollectionContext::new(Settings::default(), reporter.clone());
        (stage, reporter, CollectionData::new(ctx, &prim, "c"))
    }

    #[test]
    fn test_ordered_set_edits() {
        let (_stage, _reporter, data) = setup();
        let includes = data.include_data();
        assert!(includes.is_include());
        assert!(includes.set_strings(&["/B", "/A", "/B"]));
        assert_eq!(includes.get_strings(), vec!["/B", "/A"]);
        assert!(!includes.set_strings(&["/B", "/A"]));
        assert!(includes.add_strings(&["/C", "/A"]));
        assert_eq!(includes.get_strings(), vec!["/B", "/A", "/C"]);
        assert!(includes.remove_strings(&["/A"]));
        assert!(!includes.remove_strings(&["/A"]));
        assert!(includes.replace_strings("/B", "/D"));
        assert_eq!(includes.get_strings(), vec!["/D", "/C"]);
        assert!(includes.replace_strings("/D", "/C"));
        assert_eq!(includes.get_strings(), vec!["/C"]);
        assert!(data.exclude_data().get_strings().is_empty());
    }

    #[test]
    fn test_view_follows_rebind() {
        let (stage, _reporter, mut data) = setup();
        let other = stage.define_prim(&"/Other".parse().unwrap()).unwrap();
        let includes = data.include_data();
        includes.add_strings(&["/World/A"]);

        data.set_collection(&other, "c");
        assert!(includes.get_strings().is_empty());
        assert!(includes.add_strings(&["/Other/B"]));
        assert_eq!(data.include_data().get_strings(), vec!["/Other/B"]);

        let old = CollectionApi::new(&stage, &"/World".parse().unwrap(), "c").unwrap();
        assert_eq!(old.includes(), vec!["/World/A".parse::<ScenePath>().unwrap()]);

        data.unbind();
        assert!(!includes.add_strings(&["/Other/C"]));
        assert!(includes.get_strings().is_empty());
    }

    #[test]
    fn test_invalid_path_reported() {
        let (_stage, reporter, data) = setup();
        let excludes = data.exclude_data();
        assert!(!excludes.set_strings(&["/A", "not/absolute"]));
        assert!(excludes.get_strings().is_empty());
        assert_eq!(reporter.count(MessageType::Error), 1);
    }

    #[test]
    fn test_list_signals_are_separate() {
        let (_stage, _reporter, data) = setup();
        let include_hits = Arc::new(AtomicUsize::new(0));
        let exclude_hits = Arc::new(AtomicUsize::new(0));
        let i = Arc::clone(&include_hits);
        let e = Arc::clone(&exclude_hits);
        let _a = data.include_data().connect_data_changed(move || {
            i.fetch_add(1, Ordering::SeqCst);
        });
        let _b = data.exclude_data().connect_data_changed(move || {
            e.fetch_add(1, Ordering::SeqCst);
        });

        data.include_data().add_strings(&["/A"]);
        data.include_data().add_strings(&["/B"]);
        data.exclude_data().add_strings(&["/A/X"]);
        data.set_include_all(true);

        assert_eq!(include_hits.load(Ordering::SeqCst), 2);
        assert_eq!(exclude_hits.load(Ordering::SeqCst), 1);
    }
}
