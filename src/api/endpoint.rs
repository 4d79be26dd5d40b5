use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every REST operation the client knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Register,
    Login,
    Logout,
    TokenRefresh,
    Courses,
    CourseCreate,
    CourseDetail(i64),
    CourseUpdate(i64),
    CourseDelete(i64),
    Lessons(i64),
    LessonCreate(i64),
    LessonDetail(i64),
    LessonUpdate(i64),
    LessonDelete(i64),
    Enroll(i64),
    StudentEnrollments(i64),
    InstructorCourses,
    CourseStudents(i64),
}

impl Endpoint {
    pub fn method(&self) -> HttpMethod {
        match self {
            Endpoint::Register | Endpoint::Login | Endpoint::Logout | Endpoint::TokenRefresh => HttpMethod::Post,
            Endpoint::CourseCreate | Endpoint::LessonCreate(_) | Endpoint::Enroll(_) => HttpMethod::Post,
            Endpoint::CourseUpdate(_) | Endpoint::LessonUpdate(_) => HttpMethod::Put,
            Endpoint::CourseDelete(_) | Endpoint::LessonDelete(_) => HttpMethod::Delete,
            Endpoint::Courses
            | Endpoint::CourseDetail(_)
            | Endpoint::Lessons(_)
            | Endpoint::LessonDetail(_)
            | Endpoint::StudentEnrollments(_)
            | Endpoint::InstructorCourses
            | Endpoint::CourseStudents(_) => HttpMethod::Get,
        }
    }

    /// Path relative to the configured base URL.
    pub fn path(&self) -> String {
        match self {
            Endpoint::Register => "/register/".to_string(),
            Endpoint::Login => "/login/".to_string(),
            Endpoint::Logout => "/logout/".to_string(),
            Endpoint::TokenRefresh => "/token/refresh/".to_string(),
            Endpoint::Courses => "/courses/".to_string(),
            Endpoint::CourseCreate => "/courses/create/".to_string(),
            Endpoint::CourseDetail(id) => format!("/courses/{}/", id),
            Endpoint::CourseUpdate(id) | Endpoint::CourseDelete(id) => format!("/courses/{}/edit/", id),
            Endpoint::Lessons(course_id) => format!("/courses/{}/lessons/", course_id),
            Endpoint::LessonCreate(course_id) => format!("/courses/{}/lessons/create/", course_id),
            Endpoint::LessonDetail(id) => format!("/lessons/{}/", id),
            Endpoint::LessonUpdate(id) | Endpoint::LessonDelete(id) => format!("/lessons/{}/edit/", id),
            Endpoint::Enroll(course_id) => format!("/courses/{}/enroll/", course_id),
            Endpoint::StudentEnrollments(student_id) => format!("/students/{}/enrollments/", student_id),
            Endpoint::InstructorCourses => "/instructor/courses/".to_string(),
            Endpoint::CourseStudents(course_id) => format!("/courses/{}/students/", course_id),
        }
    }

    /// Credential exchanges authenticate with their body; everything else carries
    /// the bearer token when one is stored.
    pub fn attaches_token(&self) -> bool {
        !matches!(self, Endpoint::Register | Endpoint::Login | Endpoint::TokenRefresh)
    }
}
