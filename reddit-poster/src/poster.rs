use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use gocomics_scraper::RedditConfig;
use log::{error, info, warn};

use crate::reddit::{Credentials, PostError, Poster, Session};

/// One image to post and its title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostJob {
    pub title: String,
    pub image_path: PathBuf,
}

#[derive(Debug, Default)]
pub struct PostSummary {
    pub posted: Vec<PathBuf>,
    /// Each skip wraps the recoverable `PostError` behind it.
    pub skipped: Vec<(PathBuf, anyhow::Error)>,
    pub interrupted: bool,
}

impl PostSummary {
    fn skip(&mut self, job: &PostJob, e: PostError) {
        let e = anyhow::Error::new(e).context(format!("Could not post {}", job.title));
        error!("{:#}", e);
        self.skipped.push((job.image_path.clone(), e));
    }
}

/// Checks that must pass before anything is sent.
pub fn all_checks_passed(subreddit: &str, image_path: &Path) -> Result<(), PostError> {
    info!("Running checks...");
    if subreddit.trim().is_empty() {
        return Err(PostError::ChecksFailed("no subreddit configured".to_string()));
    }
    if !image_path.is_file() {
        return Err(PostError::ChecksFailed(format!(
            "{} is not a saved comic",
            image_path.display()
        )));
    }
    Ok(())
}

pub fn credentials(config: &RedditConfig) -> Credentials {
    Credentials {
        username: config.username.clone(),
        password: config.password.clone(),
        client_id: config.client_id.clone(),
        client_secret: config.client_secret.clone(),
    }
}

/// Posts jobs one after another through a logged-in `Poster`.
pub struct PostRun<'a, P: Poster> {
    poster: &'a P,
    config: &'a RedditConfig,
    shutdown: Option<Arc<AtomicBool>>,
}

impl<'a, P: Poster> PostRun<'a, P> {
    pub fn new(poster: &'a P, config: &'a RedditConfig) -> Self {
        PostRun {
            poster,
            config,
            shutdown: None,
        }
    }

    pub fn shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::SeqCst))
    }

    fn login(&self) -> Result<Session, PostError> {
        info!("Logging in as {}", self.config.username);
        self.poster.authenticate(&credentials(self.config))
    }

    /// Post up to `limit` jobs, `wait` seconds apart.
    ///
    /// Logs in before the first post and again whenever the session is
    /// older than `refresh`. Recoverable failures, including a failed
    /// login, skip the job; anything else ends the run.
    pub fn run(&self, jobs: &[PostJob]) -> Result<PostSummary, PostError> {
        let mut summary = PostSummary::default();
        let limit = self.config.limit as usize;
        let refresh = Duration::from_secs(self.config.refresh);
        let wait = Duration::from_secs(self.config.wait);
        let subreddit = &self.config.subreddit;

        if jobs.len() > limit {
            warn!("{} comics to post, limit is {}", jobs.len(), limit);
        }

        let mut session: Option<Session> = None;
        for (i, job) in jobs.iter().take(limit).enumerate() {
            if self.shutdown_requested() {
                warn!("Shutdown requested, not posting the remaining comics");
                summary.interrupted = true;
                break;
            }
            if i > 0 && !wait.is_zero() {
                thread::sleep(wait);
            }

            if session.as_ref().map_or(true, |s| !s.is_fresh(refresh)) {
                match self.login() {
                    Ok(fresh) => session = Some(fresh),
                    Err(e) if e.is_recoverable() => {
                        session = None;
                        summary.skip(job, e);
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }
            let Some(active) = session.as_ref() else {
                continue;
            };

            let result = all_checks_passed(subreddit, &job.image_path).and_then(|_| {
                self.poster
                    .publish_image(active, subreddit, &job.title, &job.image_path)
            });

            match result {
                Ok(()) => {
                    info!("Posted {} to r/{}", job.title, subreddit);
                    summary.posted.push(job.image_path.clone());
                }
                Err(e) if e.is_recoverable() => summary.skip(job, e),
                Err(e) => return Err(e),
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::tempdir;

    /// Records what it was asked to post and fails on chosen titles or
    /// login attempts.
    #[derive(Default)]
    struct FakePoster {
        logins: RefCell<u32>,
        posted: RefCell<Vec<String>>,
        busy_titles: Vec<String>,
        fatal_titles: Vec<String>,
        /// 1-based login attempts answered with a 503.
        busy_logins: Vec<u32>,
        reject_logins: bool,
    }

    impl Poster for FakePoster {
        fn authenticate(&self, _credentials: &Credentials) -> Result<Session, PostError> {
            *self.logins.borrow_mut() += 1;
            let attempt = *self.logins.borrow();
            if self.reject_logins {
                return Err(PostError::Auth("invalid_grant".to_string()));
            }
            if self.busy_logins.contains(&attempt) {
                return Err(PostError::Status {
                    step: "login",
                    status: StatusCode::SERVICE_UNAVAILABLE,
                });
            }
            Ok(Session::new("tok", Duration::from_secs(3600)))
        }

        fn publish_image(
            &self,
            _session: &Session,
            _subreddit: &str,
            title: &str,
            _image_path: &Path,
        ) -> Result<(), PostError> {
            if self.busy_titles.iter().any(|t| t == title) {
                return Err(PostError::Status {
                    step: "submit",
                    status: StatusCode::SERVICE_UNAVAILABLE,
                });
            }
            if self.fatal_titles.iter().any(|t| t == title) {
                return Err(PostError::Auth("token revoked".to_string()));
            }
            self.posted.borrow_mut().push(title.to_string());
            Ok(())
        }
    }

    fn post_error(summary: &PostSummary, i: usize) -> Option<&PostError> {
        summary.skipped.get(i).and_then(|(_, e)| e.downcast_ref())
    }

    fn config(limit: u32, refresh: u64) -> RedditConfig {
        RedditConfig {
            username: "bot".to_string(),
            password: "pw".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            limit,
            wait: 0,
            refresh,
            subreddit: "comics".to_string(),
        }
    }

    fn jobs(dir: &Path, titles: &[&str]) -> Vec<PostJob> {
        titles
            .iter()
            .map(|title| {
                let image_path = dir.join(format!("{}.gif", title));
                fs::write(&image_path, b"GIF89a").unwrap();
                PostJob {
                    title: title.to_string(),
                    image_path,
                }
            })
            .collect()
    }

    #[test]
    fn test_checks() {
        let dir = tempdir().unwrap();
        let image = dir.path().join("strip.gif");
        fs::write(&image, b"GIF89a").unwrap();

        assert!(all_checks_passed("comics", &image).is_ok());
        assert!(all_checks_passed(" ", &image).is_err());
        assert!(all_checks_passed("comics", &dir.path().join("absent.gif")).is_err());
        assert!(all_checks_passed("comics", dir.path()).is_err());
    }

    #[test]
    fn test_recoverable_failure_skips_job() {
        let dir = tempdir().unwrap();
        let poster = FakePoster {
            busy_titles: vec!["b".to_string()],
            ..Default::default()
        };
        let config = config(10, 3600);

        let summary = PostRun::new(&poster, &config)
            .run(&jobs(dir.path(), &["a", "b", "c"]))
            .unwrap();

        assert_eq!(*poster.posted.borrow(), vec!["a", "c"]);
        assert_eq!(summary.posted.len(), 2);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(*poster.logins.borrow(), 1);
    }

    #[test]
    fn test_unrecoverable_failure_ends_run() {
        let dir = tempdir().unwrap();
        let poster = FakePoster {
            fatal_titles: vec!["b".to_string()],
            ..Default::default()
        };
        let config = config(10, 3600);

        let result = PostRun::new(&poster, &config).run(&jobs(dir.path(), &["a", "b", "c"]));

        assert!(matches!(result, Err(PostError::Auth(_))));
        assert_eq!(*poster.posted.borrow(), vec!["a"]);
    }

    #[test]
    fn test_limit_caps_posts() {
        let dir = tempdir().unwrap();
        let poster = FakePoster::default();
        let config = config(2, 3600);

        let summary = PostRun::new(&poster, &config)
            .run(&jobs(dir.path(), &["a", "b", "c"]))
            .unwrap();

        assert_eq!(summary.posted.len(), 2);
        assert_eq!(*poster.posted.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn test_missing_image_is_skipped() {
        let dir = tempdir().unwrap();
        let poster = FakePoster::default();
        let config = config(10, 3600);
        let mut all = jobs(dir.path(), &["a"]);
        all.insert(
            0,
            PostJob {
                title: "never downloaded".to_string(),
                image_path: dir.path().join("missing.gif"),
            },
        );

        let summary = PostRun::new(&poster, &config).run(&all).unwrap();

        assert_eq!(*poster.posted.borrow(), vec!["a"]);
        assert!(matches!(
            post_error(&summary, 0),
            Some(PostError::ChecksFailed(_))
        ));
    }

    #[test]
    fn test_stale_session_logs_in_again() {
        let dir = tempdir().unwrap();
        let poster = FakePoster::default();
        // A zero refresh window makes every session stale right away.
        let config = config(10, 0);

        PostRun::new(&poster, &config)
            .run(&jobs(dir.path(), &["a", "b"]))
            .unwrap();

        assert_eq!(*poster.logins.borrow(), 2);
    }

    #[test]
    fn test_busy_relogin_skips_only_that_job() {
        let dir = tempdir().unwrap();
        let poster = FakePoster {
            busy_logins: vec![2],
            ..Default::default()
        };
        let config = config(10, 0);

        let summary = PostRun::new(&poster, &config)
            .run(&jobs(dir.path(), &["a", "b", "c"]))
            .unwrap();

        assert_eq!(*poster.posted.borrow(), vec!["a", "c"]);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].0, dir.path().join("b.gif"));
        assert!(matches!(
            post_error(&summary, 0),
            Some(PostError::Status { step: "login", .. })
        ));
        assert_eq!(*poster.logins.borrow(), 3);
    }

    #[test]
    fn test_busy_first_login_tries_again_for_next_job() {
        let dir = tempdir().unwrap();
        let poster = FakePoster {
            busy_logins: vec![1],
            ..Default::default()
        };
        let config = config(10, 3600);

        let summary = PostRun::new(&poster, &config)
            .run(&jobs(dir.path(), &["a", "b"]))
            .unwrap();

        assert_eq!(*poster.posted.borrow(), vec!["b"]);
        assert_eq!(summary.skipped.len(), 1);
        assert!(format!("{:#}", summary.skipped[0].1).starts_with("Could not post a: login"));
    }

    #[test]
    fn test_rejected_login_ends_run() {
        let dir = tempdir().unwrap();
        let poster = FakePoster {
            reject_logins: true,
            ..Default::default()
        };
        let config = config(10, 3600);

        let result = PostRun::new(&poster, &config).run(&jobs(dir.path(), &["a", "b"]));

        assert!(matches!(result, Err(PostError::Auth(_))));
        assert_eq!(*poster.logins.borrow(), 1);
        assert!(poster.posted.borrow().is_empty());
    }

    #[test]
    fn test_shutdown_flag() {
        let dir = tempdir().unwrap();
        let poster = FakePoster::default();
        let config = config(10, 3600);

        let summary = PostRun::new(&poster, &config)
            .shutdown_flag(Arc::new(AtomicBool::new(true)))
            .run(&jobs(dir.path(), &["a"]))
            .unwrap();

        assert!(summary.interrupted);
        assert!(poster.posted.borrow().is_empty());
    }
}
