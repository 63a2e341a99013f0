//! Finish times and best-time classification.

use std::time::Duration;

use parkforge_course::PlayerId;

/// How a finish time compares with the stored records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeResult {
    None,
    PlayerBest,
    GlobalBest,
}

impl TimeResult {
    /// Classifies `elapsed` against the course record and the player's own
    /// best. Both comparisons are strict; a missing record always loses.
    pub fn classify(
        elapsed: Duration,
        course_best: Option<Duration>,
        player_best: Option<Duration>,
    ) -> Self {
        if course_best.is_none_or(|best| elapsed < best) {
            Self::GlobalBest
        } else if player_best.is_none_or(|best| elapsed < best) {
            Self::PlayerBest
        } else {
            Self::None
        }
    }

    pub fn is_record(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Storage for course times. The engine only needs bests and a write path.
pub trait Leaderboard {
    /// Fastest time anyone has on the course.
    fn course_best(&self, course: &str) -> Option<Duration>;

    /// This player's fastest time on the course.
    fn player_best(&self, player: PlayerId, course: &str) -> Option<Duration>;

    /// Stores a finish time. `new_record` tells update-in-place stores
    /// whether the existing row should be replaced.
    fn insert_or_update_time(
        &mut self,
        course: &str,
        player: PlayerId,
        elapsed: Duration,
        deaths: u32,
        new_record: bool,
    );

    fn delete_player_times(&mut self, player: PlayerId);

    fn is_best_course_time(&self, course: &str, elapsed: Duration) -> bool {
        self.course_best(course).is_none_or(|best| elapsed < best)
    }

    fn is_best_player_time(&self, player: PlayerId, course: &str, elapsed: Duration) -> bool {
        self.player_best(player, course)
            .is_none_or(|best| elapsed < best)
    }

    fn has_player_time(&self, player: PlayerId, course: &str) -> bool {
        self.player_best(player, course).is_some()
    }

    /// [`TimeResult::classify`] against this board.
    fn time_result(&self, player: PlayerId, course: &str, elapsed: Duration) -> TimeResult {
        TimeResult::classify(
            elapsed,
            self.course_best(course),
            self.player_best(player, course),
        )
    }
}

/// One stored finish.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeEntry {
    pub course: String,
    pub player: PlayerId,
    pub elapsed: Duration,
    pub deaths: u32,
}

/// An in-memory [`Leaderboard`].
///
/// By default every finish appends a row. With
/// [`update_in_place`](Self::update_in_place) each player keeps one row per
/// course, replaced only by a new record.
#[derive(Debug, Default, Clone)]
pub struct MemoryLeaderboard {
    entries: Vec<TimeEntry>,
    update_in_place: bool,
}

impl MemoryLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_in_place(mut self) -> Self {
        self.update_in_place = true;
        self
    }

    pub fn entries(&self) -> &[TimeEntry] {
        &self.entries
    }

    /// Fastest `limit` times on a course, best first.
    pub fn top(&self, course: &str, limit: usize) -> Vec<&TimeEntry> {
        let mut times: Vec<&TimeEntry> = self
            .entries
            .iter()
            .filter(|e| e.course.eq_ignore_ascii_case(course))
            .collect();
        times.sort_by_key(|e| e.elapsed);
        times.truncate(limit);
        times
    }

    fn times_on<'a>(&'a self, course: &'a str) -> impl Iterator<Item = &'a TimeEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.course.eq_ignore_ascii_case(course))
    }
}

impl Leaderboard for MemoryLeaderboard {
    fn course_best(&self, course: &str) -> Option<Duration> {
        self.times_on(course).map(|e| e.elapsed).min()
    }

    fn player_best(&self, player: PlayerId, course: &str) -> Option<Duration> {
        self.times_on(course)
            .filter(|e| e.player == player)
            .map(|e| e.elapsed)
            .min()
    }

    fn insert_or_update_time(
        &mut self,
        course: &str,
        player: PlayerId,
        elapsed: Duration,
        deaths: u32,
        new_record: bool,
    ) {
        let entry = TimeEntry {
            course: course.to_string(),
            player,
            elapsed,
            deaths,
        };

        if self.update_in_place {
            let existing = self
                .entries
                .iter_mut()
                .find(|e| e.player == player && e.course.eq_ignore_ascii_case(course));
            match existing {
                Some(row) if new_record => *row = entry,
                Some(_) => {}
                None => self.entries.push(entry),
            }
        } else {
            self.entries.push(entry);
        }

        tracing::debug!(%player, course, elapsed_ms = elapsed.as_millis() as u64, "time recorded");
    }

    fn delete_player_times(&mut self, player: PlayerId) {
        self.entries.retain(|e| e.player != player);
    }
}
