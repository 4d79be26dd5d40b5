pub mod scope;

pub use scope::{CancelToken, ViewScope};

use crate::models::course::Course;
use crate::models::session::SessionState;
use crate::models::user::{Role, User};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum View {
    #[default]
    Courses,
    CourseDetail,
    MyEnrollments,
    MyCourses,
    CourseStudents,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Courses => "courses",
            View::CourseDetail => "course-detail",
            View::MyEnrollments => "my-enrollments",
            View::MyCourses => "my-courses",
            View::CourseStudents => "course-students",
        }
    }

    /// The only role allowed on this view, if it is gated.
    pub fn required_role(&self) -> Option<Role> {
        match self {
            View::MyEnrollments => Some(Role::Student),
            View::MyCourses | View::CourseStudents => Some(Role::Instructor),
            View::Courses | View::CourseDetail => None,
        }
    }

    pub fn needs_course(&self) -> bool {
        matches!(self, View::CourseDetail | View::CourseStudents)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown tokens fall back to the default view.
impl FromStr for View {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "course-detail" => View::CourseDetail,
            "my-enrollments" => View::MyEnrollments,
            "my-courses" => View::MyCourses,
            "course-students" => View::CourseStudents,
            _ => View::Courses,
        })
    }
}

/// How a course was picked from a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectMode {
    #[default]
    Detail,
    EnrolledStudents,
}

/// What should be on screen right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Loading,
    SignIn,
    CourseList,
    CourseDetail { course_id: i64 },
    MyEnrollments,
    MyCourses,
    CourseStudents { course_id: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavEntry {
    pub view: View,
    pub label: &'static str,
}

/// Current-view state machine for the signed-in area.
///
/// Every view change replaces the [`ViewScope`], which cancels whatever the
/// previous view still had in flight.
#[derive(Debug, Default)]
pub struct ViewRouter {
    current: View,
    selected_course: Option<i64>,
    select_mode: SelectMode,
    editing_course: Option<Course>,
    course_form_open: bool,
    refresh_key: u64,
    scope: ViewScope,
}

impl ViewRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> View {
        self.current
    }

    pub fn selected_course(&self) -> Option<i64> {
        self.selected_course
    }

    pub fn select_mode(&self) -> SelectMode {
        self.select_mode
    }

    pub fn editing_course(&self) -> Option<&Course> {
        self.editing_course.as_ref()
    }

    pub fn is_course_form_open(&self) -> bool {
        self.course_form_open
    }

    /// Bumped after every saved course so list screens refetch.
    pub fn refresh_key(&self) -> u64 {
        self.refresh_key
    }

    /// Token for requests issued by the current view.
    pub fn token(&self) -> CancelToken {
        self.scope.token()
    }

    pub fn navigate(&mut self, view: View) {
        self.selected_course = None;
        self.editing_course = None;
        self.course_form_open = false;
        self.enter(view);
    }

    pub fn select_course(&mut self, course_id: i64, mode: SelectMode) {
        self.selected_course = Some(course_id);
        self.select_mode = mode;
        let view = match mode {
            SelectMode::Detail => View::CourseDetail,
            SelectMode::EnrolledStudents => View::CourseStudents,
        };
        self.enter(view);
    }

    pub fn back_to_courses(&mut self) {
        self.selected_course = None;
        self.enter(View::Courses);
    }

    pub fn open_create_course_form(&mut self) {
        self.editing_course = None;
        self.course_form_open = true;
    }

    pub fn open_edit_course_form(&mut self, course: &Course) {
        self.editing_course = Some(course.clone());
        self.course_form_open = true;
    }

    pub fn close_course_form(&mut self) {
        self.course_form_open = false;
        self.editing_course = None;
    }

    /// Closes the form and refreshes. A course detail view stays put; any
    /// other view returns to the course list.
    pub fn course_saved(&mut self) {
        self.close_course_form();
        self.refresh_key += 1;
        let next = if self.current == View::CourseDetail {
            View::CourseDetail
        } else {
            View::Courses
        };
        self.enter(next);
    }

    /// Screen to show for `session`. A view the user may not see, or one
    /// missing its course, silently resets to the course list.
    pub fn resolve(&mut self, session: &SessionState) -> Screen {
        let user = match session {
            SessionState::Uninitialized | SessionState::Loading => return Screen::Loading,
            SessionState::Anonymous => return Screen::SignIn,
            SessionState::Authenticated(user) => user,
        };

        if !self.permits(user) {
            debug!(view = %self.current, role = %user.role, "view not available, redirecting to courses");
            self.navigate(View::Courses);
        }

        match (self.current, self.selected_course) {
            (View::CourseDetail, Some(course_id)) => Screen::CourseDetail { course_id },
            (View::CourseStudents, Some(course_id)) => Screen::CourseStudents { course_id },
            (View::MyEnrollments, _) => Screen::MyEnrollments,
            (View::MyCourses, _) => Screen::MyCourses,
            _ => Screen::CourseList,
        }
    }

    fn permits(&self, user: &User) -> bool {
        let role_ok = self.current.required_role().is_none_or(|role| user.has_role(role));
        let course_ok = !self.current.needs_course() || self.selected_course.is_some();
        role_ok && course_ok
    }

    fn enter(&mut self, view: View) {
        debug!(from = %self.current, to = %view, "view change");
        self.current = view;
        self.scope = ViewScope::new();
    }
}

/// Header entries for `user`.
pub fn navigation(user: &User) -> Vec<NavEntry> {
    let mut entries = vec![NavEntry {
        view: View::Courses,
        label: "All Courses",
    }];
    if user.has_role(Role::Student) {
        entries.push(NavEntry {
            view: View::MyEnrollments,
            label: "My Courses",
        });
    }
    if user.has_role(Role::Instructor) {
        entries.push(NavEntry {
            view: View::MyCourses,
            label: "My Courses",
        });
    }
    entries
}
