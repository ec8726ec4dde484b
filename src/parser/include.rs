use std::fs;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::thread;

use glob::glob;
use log::debug;

use super::stream::Sink;
use super::{ParserOptions, Tokenizer};
use crate::{Error, IncludeError};

/// The chain of files being parsed, from the included file up to the top one
///
/// Used to detect include loops.
#[derive(Debug)]
pub(crate) struct Context<'a> {
    file: Option<PathBuf>,
    parent: Option<&'a Context<'a>>,
}

impl<'a> Context<'a> {
    pub(crate) fn root(source: &str) -> Context<'a> {
        let file = if source.is_empty() {
            None
        } else {
            fs::canonicalize(source).ok()
        };
        Context { file, parent: None }
    }

    fn child(file: PathBuf, parent: &'a Context<'a>) -> Context<'a> {
        Context {
            file: Some(file),
            parent: Some(parent),
        }
    }

    fn contains(&self, file: &Path) -> bool {
        let mut context = Some(self);
        while let Some(current) = context {
            if current.file.as_deref() == Some(file) {
                return true;
            }
            context = current.parent;
        }
        false
    }
}

impl<'a, R: BufRead> Tokenizer<'a, R> {
    /// Handles include directive
    ///
    /// The pattern is relative to the directory of the current file. Every matched file is
    /// parsed in place, in parallel when there are several of them and the options allow it.
    pub(super) fn include(&mut self, pattern: &str, line: usize) -> Result<(), Error> {
        let source = self.source().to_string();
        let fail = |cause| Error::include(&source, line, pattern, cause);

        let full_pattern = Path::new(&source)
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(pattern);
        let entries = glob(&full_pattern.to_string_lossy())
            .map_err(|e| fail(IncludeError::InvalidPattern(e.msg.to_string())))?;

        let mut files: Vec<(PathBuf, PathBuf)> = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                Error::cannot_read(path, io::Error::from(e))
            })?;
            let canonical = fs::canonicalize(&path).map_err(|e| Error::cannot_read(&path, e))?;
            if self.context.contains(&canonical) {
                return Err(fail(IncludeError::Loop(path)));
            }
            files.push((path, canonical));
        }
        if files.is_empty() {
            return Err(fail(IncludeError::NotFound));
        }
        debug!(
            "{}:{}: including {} file(s) for {:?}",
            source,
            line,
            files.len(),
            pattern
        );

        let context = self.context;
        let options = self.options;
        let sink = self.sink;
        if !options.concurrent_includes || files.len() == 1 {
            for (path, canonical) in files {
                parse_included(&path, canonical, context, options, sink)?;
            }
            Ok(())
        } else if sink.interleaves() {
            thread::scope(|scope| {
                let branches: Vec<_> = files
                    .into_iter()
                    .map(|(path, canonical)| {
                        let sink = sink.clone();
                        scope.spawn(move || parse_included(&path, canonical, context, options, &sink))
                    })
                    .collect();
                // Every branch is joined before reporting, in the order of the paths
                let results: Vec<Result<(), Error>> = branches.into_iter().map(join).collect();
                results.into_iter().collect()
            })
        } else {
            thread::scope(|scope| {
                let branches: Vec<_> = files
                    .into_iter()
                    .map(|(path, canonical)| {
                        let (branch, buffer) = sink.branch();
                        let handle = {
                            let branch = branch.clone();
                            scope.spawn(move || {
                                parse_included(&path, canonical, context, options, &branch)
                            })
                        };
                        (branch, buffer, handle)
                    })
                    .collect();
                // Replayed in path order, so the results are those of a sequential parse
                let mut branches = branches.into_iter();
                while let Some((_, buffer, handle)) = branches.next() {
                    let result = join(handle);
                    let delivered = sink.replay(buffer);
                    if result.is_err() || !delivered {
                        for (later, _, _) in branches.by_ref() {
                            later.abort();
                        }
                        return result;
                    }
                }
                Ok(())
            })
        }
    }
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}

fn parse_included(
    path: &Path,
    canonical: PathBuf,
    parent: &Context,
    options: &ParserOptions,
    sink: &Sink,
) -> Result<(), Error> {
    let result = File::open(path)
        .map_err(|e| Error::cannot_read(path, e))
        .and_then(|file| {
            let context = Context::child(canonical, parent);
            let source = path.to_string_lossy();
            Tokenizer::new(&source, BufReader::new(file), &context, options, sink).tokenize()
        });
    if result.is_err() {
        // Producers sharing the sink stop at their next block
        sink.abort();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_chain() {
        let root = Context {
            file: Some(PathBuf::from("/a.journal")),
            parent: None,
        };
        let child = Context::child(PathBuf::from("/b.journal"), &root);
        assert!(child.contains(Path::new("/a.journal")));
        assert!(child.contains(Path::new("/b.journal")));
        assert!(!root.contains(Path::new("/b.journal")));
        assert!(!Context::root("").contains(Path::new("")));
    }
}
