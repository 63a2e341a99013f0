//! Course lookup.
//!
//! The engine only ever asks two questions of the course store: "give me
//! this course" and "does it exist". [`CourseRegistry`] captures exactly
//! that, so a host can back it with files, a database, or the in-memory
//! [`CourseCatalog`] provided here.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{Course, CourseError};

/// Looks up immutable course definitions by name.
pub trait CourseRegistry {
    /// Finds a course by name. Implementations should compare names
    /// case-insensitively.
    fn find_course(&self, name: &str) -> Option<Arc<Course>>;

    /// Whether a course with this name exists.
    fn course_exists(&self, name: &str) -> bool {
        self.find_course(name).is_some()
    }
}

/// In-memory course registry keyed by lower-cased name.
///
/// `BTreeMap` keeps [`course_names`](Self::course_names) sorted, which is
/// what players expect from a course list.
#[derive(Debug, Default, Clone)]
pub struct CourseCatalog {
    courses: BTreeMap<String, Arc<Course>>,
}

impl CourseCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers a course.
    ///
    /// # Errors
    /// - [`CourseError::InvalidCourse`] if the course fails validation
    /// - [`CourseError::Duplicate`] if the name is already taken
    pub fn insert(&mut self, course: Course) -> Result<Arc<Course>, CourseError> {
        course.validate()?;
        let key = course.name.to_lowercase();
        if self.courses.contains_key(&key) {
            return Err(CourseError::Duplicate(course.name));
        }
        let course = Arc::new(course);
        self.courses.insert(key, Arc::clone(&course));
        tracing::debug!(course = %course.name, checkpoints = course.checkpoint_count(), "course registered");
        Ok(course)
    }

    /// Removes a course. Sessions already holding it keep their `Arc`.
    pub fn remove(&mut self, name: &str) -> Option<Arc<Course>> {
        self.courses.remove(&name.to_lowercase())
    }

    /// Registered course names, sorted.
    pub fn course_names(&self) -> Vec<String> {
        self.courses.values().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    /// Parses a JSON array of courses and registers each one.
    ///
    /// Fails on the first invalid or duplicate course; nothing from a failed
    /// load is kept.
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> Result<Self, CourseError> {
        let courses: Vec<Course> = serde_json::from_str(json).map_err(CourseError::Decode)?;
        let mut catalog = Self::new();
        for course in courses {
            catalog.insert(course)?;
        }
        tracing::info!(courses = catalog.len(), "course catalog loaded");
        Ok(catalog)
    }
}

impl CourseRegistry for CourseCatalog {
    fn find_course(&self, name: &str) -> Option<Arc<Course>> {
        self.courses.get(&name.to_lowercase()).cloned()
    }
}
