use crate::error::AppError;
use crate::models::course::Course;
use crate::models::enrollment::Enrollment;
use crate::service::auth::SessionContext;
use crate::service::service_util::fetch_json;

/// A course and the students enrolled in it.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseRoster {
    pub course: Course,
    pub enrollments: Vec<Enrollment>,
}

pub struct InstructorService<'a> {
    session: &'a SessionContext,
}

impl<'a> InstructorService<'a> {
    pub fn new(session: &'a SessionContext) -> Self {
        InstructorService { session }
    }

    pub async fn my_courses(&self) -> Result<Vec<Course>, AppError> {
        let response = self.session.client().instructor_courses().await?;
        fetch_json(response, "Failed to fetch your courses")
    }

    pub async fn roster(&self, course_id: i64) -> Result<CourseRoster, AppError> {
        let client = self.session.client();
        let (course, students) = tokio::join!(client.get_course(course_id), client.course_students(course_id));
        let (course, students) = (course?, students?);

        const FAILED: &str = "Failed to fetch course and student data";
        Ok(CourseRoster {
            course: fetch_json(course, FAILED)?,
            enrollments: fetch_json(students, FAILED)?,
        })
    }
}
