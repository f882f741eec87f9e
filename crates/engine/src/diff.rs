//! Status diff detection.
//!
//! [`PreviousStatusMap`] remembers the last seen status of every job id and
//! turns each new snapshot into the list of [`TransitionEvent`]s it implies.
//! Jobs missing from a snapshot keep their entry: they may reappear after a
//! scope change, and a stale entry is harmless.

use std::collections::HashMap;

use reelwatch_core::{Job, JobId, TransitionEvent, VideoJobStatus};

#[derive(Debug, Default, Clone)]
pub struct PreviousStatusMap {
    statuses: HashMap<JobId, VideoJobStatus>,
}

impl PreviousStatusMap {
    pub fn get(&self, job_id: &str) -> Option<VideoJobStatus> {
        self.statuses.get(job_id).copied()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Record the statuses in `jobs` and return the transitions they imply.
    ///
    /// Every job in `jobs` is recorded, changed or not. A job seen for the
    /// first time produces no transition.
    pub fn observe(&mut self, jobs: &[Job]) -> Vec<TransitionEvent> {
        let mut transitions = Vec::new();

        for job in jobs {
            let previous = self.statuses.insert(job.id.clone(), job.status);
            match previous {
                Some(from) if from != job.status => transitions.push(TransitionEvent {
                    job_id: job.id.clone(),
                    from,
                    to: job.status,
                    title: job.title.clone(),
                }),
                _ => {}
            }
        }

        transitions
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: &str, status: VideoJobStatus) -> Job {
        Job::new(id, status)
    }

    #[test]
    fn first_observation_emits_nothing() {
        let mut map = PreviousStatusMap::default();
        let transitions = map.observe(&[job("a", VideoJobStatus::Ready)]);
        assert!(transitions.is_empty());
        assert_eq!(map.get("a"), Some(VideoJobStatus::Ready));
    }

    #[test]
    fn waiting_to_ready_is_a_video_ready_transition() {
        let mut map = PreviousStatusMap::default();
        map.observe(&[job("a", VideoJobStatus::WaitingVideo)]);

        let transitions = map.observe(&[job("a", VideoJobStatus::Ready).with_title("Recap")]);

        assert_eq!(transitions.len(), 1);
        let event = &transitions[0];
        assert_eq!(event.from, VideoJobStatus::WaitingVideo);
        assert_eq!(event.to, VideoJobStatus::Ready);
        assert_eq!(event.title.as_deref(), Some("Recap"));
        assert!(event.is_video_ready());
    }

    #[test]
    fn unchanged_status_emits_nothing() {
        let mut map = PreviousStatusMap::default();
        map.observe(&[job("a", VideoJobStatus::Sending)]);
        assert!(map.observe(&[job("a", VideoJobStatus::Sending)]).is_empty());
    }

    #[test]
    fn later_transitions_are_not_video_ready() {
        let mut map = PreviousStatusMap::default();
        map.observe(&[job("a", VideoJobStatus::Ready)]);

        let transitions = map.observe(&[job("a", VideoJobStatus::Uploading)]);
        assert_eq!(transitions.len(), 1);
        assert!(!transitions[0].is_video_ready());
    }

    #[test]
    fn absent_jobs_keep_their_entry() {
        let mut map = PreviousStatusMap::default();
        map.observe(&[
            job("a", VideoJobStatus::Downloading),
            job("b", VideoJobStatus::Queued),
        ]);
        map.observe(&[job("b", VideoJobStatus::Sending)]);

        assert_eq!(map.get("a"), Some(VideoJobStatus::Downloading));

        // "a" reappears ready: still computed against its last known status.
        let transitions = map.observe(&[job("a", VideoJobStatus::Ready)]);
        assert!(transitions[0].is_video_ready());
    }

    #[test]
    fn map_converges_to_latest_snapshot() {
        let snapshots = [
            vec![job("a", VideoJobStatus::Queued), job("b", VideoJobStatus::Queued)],
            vec![job("a", VideoJobStatus::Downloading), job("c", VideoJobStatus::Error)],
            vec![
                job("a", VideoJobStatus::Ready),
                job("b", VideoJobStatus::Timeout),
                job("c", VideoJobStatus::Error),
            ],
        ];

        let mut map = PreviousStatusMap::default();
        for snapshot in &snapshots {
            map.observe(snapshot);
        }

        for job in snapshots.last().unwrap() {
            assert_eq!(map.get(&job.id), Some(job.status));
        }
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn each_job_reports_its_own_transition() {
        let mut map = PreviousStatusMap::default();
        map.observe(&[
            job("a", VideoJobStatus::Downloading),
            job("b", VideoJobStatus::Sending),
        ]);

        let transitions = map.observe(&[
            job("a", VideoJobStatus::Ready),
            job("b", VideoJobStatus::Error),
        ]);

        let ready: Vec<_> = transitions.iter().filter(|t| t.is_video_ready()).collect();
        assert_eq!(transitions.len(), 2);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].job_id, "a");
    }
}
