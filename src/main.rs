use clap::{Parser, Subcommand};
use learnhub::error::AppError;
use learnhub::models::course::{Course, CourseRequest};
use learnhub::models::enrollment::Enrollment;
use learnhub::models::lesson::LessonRequest;
use learnhub::models::session::SessionState;
use learnhub::models::user::{LoginRequest, RegisterRequest, Role};
use learnhub::router::{Screen, SelectMode, View, ViewRouter, navigation};
use learnhub::service::auth::{LoginOutcome, RegisterOutcome, SessionContext};
use learnhub::service::course::{CourseDetail, CourseService};
use learnhub::service::enrollment::{EnrollmentOutcome, EnrollmentService};
use learnhub::service::instructor::InstructorService;
use learnhub::service::lesson::LessonService;
use learnhub::{Config, build_session, init_tracing};

#[derive(Debug, Parser)]
#[command(name = "learnhub", about = "Command line client for the LearnHub learning platform")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and store the session locally
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Create a new account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// student or instructor
        #[arg(long, default_value = "student")]
        role: Role,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user and the sections available to them
    Whoami,
    /// List all courses
    Courses,
    /// Show a course and its lessons
    Course { id: i64 },
    CreateCourse {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
    },
    EditCourse {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    DeleteCourse {
        id: i64,
        /// Confirm the deletion
        #[arg(long, action = clap::ArgAction::SetTrue)]
        yes: bool,
    },
    AddLesson {
        course_id: i64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long, value_name = "URL")]
        video_link: Option<String>,
        /// Length in minutes (1-600)
        #[arg(long, value_name = "MINUTES")]
        duration: i32,
    },
    EditLesson {
        course_id: i64,
        lesson_id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long, value_name = "URL")]
        video_link: Option<String>,
        #[arg(long, value_name = "MINUTES")]
        duration: Option<i32>,
    },
    DeleteLesson {
        course_id: i64,
        lesson_id: i64,
        /// Confirm the deletion
        #[arg(long, action = clap::ArgAction::SetTrue)]
        yes: bool,
    },
    /// Enroll in a course (students)
    Enroll { course_id: i64 },
    /// List the courses you are enrolled in (students)
    Enrollments,
    /// List the courses you teach (instructors)
    MyCourses,
    /// List the students enrolled in one of your courses (instructors)
    Students { course_id: i64 },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    App(#[from] AppError),
    #[error("{0}")]
    Rejected(String),
}

impl CliError {
    fn message(&self) -> String {
        match self {
            CliError::App(e) => e.user_message(),
            CliError::Rejected(message) => message.clone(),
        }
    }
}

fn rejected(message: impl Into<String>) -> CliError {
    CliError::Rejected(message.into())
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level, config.logging.json_format);

    let session = match build_session(&config) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("Failed to start: {}", err.user_message());
            std::process::exit(1);
        }
    };

    if let Err(err) = run(cli.cmd, &session).await {
        eprintln!("{}", err.message());
        std::process::exit(1);
    }
}

async fn run(cmd: Command, session: &SessionContext) -> Result<(), CliError> {
    let mut router = ViewRouter::new();

    match cmd {
        Command::Login { username, password } => match session.login(&LoginRequest::new(username, password)).await {
            LoginOutcome::Success(user) => println!("Signed in as {} ({})", user.username, user.role),
            LoginOutcome::Failure { message } => return Err(rejected(message)),
        },
        Command::Register {
            username,
            email,
            password,
            role,
        } => {
            let request = RegisterRequest {
                username,
                email,
                password,
                role,
            };
            match session.register(&request).await {
                RegisterOutcome::Registered => println!("Account created. You can now sign in."),
                RegisterOutcome::Rejected(error) => return Err(rejected(error.display_message())),
            }
        }
        Command::Logout => {
            session.logout().await;
            println!("Signed out.");
        }
        Command::Whoami => match session.state() {
            SessionState::Authenticated(user) => {
                println!("{} (id {}, {})", user.username, user.id, user.role);
                let sections: Vec<&str> = navigation(&user).iter().map(|entry| entry.label).collect();
                println!("Sections: {}", sections.join(", "));
            }
            _ => println!("Not signed in."),
        },
        Command::Courses => {
            router.navigate(View::Courses);
            current_screen(&mut router, session)?;
            list_courses(&router, session).await?;
        }
        Command::Course { id } => {
            router.select_course(id, SelectMode::Detail);
            current_screen(&mut router, session)?;
            let detail = router.token().run(CourseService::new(session).detail(id)).await?;
            print_course_detail(&detail, session);
        }
        Command::CreateCourse { title, description } => {
            router.navigate(View::Courses);
            current_screen(&mut router, session)?;

            let courses = CourseService::new(session);
            if !courses.can_create() {
                return Err(rejected("Only instructors and admins can create courses."));
            }
            router.open_create_course_form();
            router.token().run(courses.save(None, &CourseRequest::new(title, description))).await?;
            router.course_saved();

            println!("Course created.");
            list_courses(&router, session).await?;
        }
        Command::EditCourse { id, title, description } => {
            let detail = open_editable_course(&mut router, session, id).await?;
            router.open_edit_course_form(&detail.course);

            let mut request = CourseRequest::from(&detail.course);
            if let Some(title) = title {
                request.title = title;
            }
            if let Some(description) = description {
                request.description = description;
            }
            router
                .token()
                .run(CourseService::new(session).save(Some(&detail.course), &request))
                .await?;
            router.course_saved();

            println!("Course updated.");
            let detail = router.token().run(CourseService::new(session).detail(id)).await?;
            print_course_detail(&detail, session);
        }
        Command::DeleteCourse { id, yes } => {
            confirm(yes, &format!("course {}", id))?;
            open_editable_course(&mut router, session, id).await?;
            router.token().run(CourseService::new(session).delete(id)).await?;
            router.back_to_courses();
            println!("Course {} deleted.", id);
        }
        Command::AddLesson {
            course_id,
            title,
            content,
            video_link,
            duration,
        } => {
            open_editable_course(&mut router, session, course_id).await?;
            let request = LessonRequest::new(title, content, video_link, duration);
            router.token().run(LessonService::new(session).save(course_id, None, &request)).await?;

            println!("Lesson added.");
            let detail = router.token().run(CourseService::new(session).detail(course_id)).await?;
            print_course_detail(&detail, session);
        }
        Command::EditLesson {
            course_id,
            lesson_id,
            title,
            content,
            video_link,
            duration,
        } => {
            let detail = open_editable_course(&mut router, session, course_id).await?;
            let lesson = detail
                .lessons
                .iter()
                .find(|lesson| lesson.id == lesson_id)
                .ok_or_else(|| rejected(format!("Lesson {} is not part of course {}.", lesson_id, course_id)))?;

            let request = LessonRequest::new(
                title.unwrap_or_else(|| lesson.title.clone()),
                content.unwrap_or_else(|| lesson.content.clone()),
                video_link.or_else(|| lesson.video_link.clone()),
                duration.unwrap_or(lesson.duration),
            );
            router
                .token()
                .run(LessonService::new(session).save(course_id, Some(lesson), &request))
                .await?;

            println!("Lesson updated.");
            let detail = router.token().run(CourseService::new(session).detail(course_id)).await?;
            print_course_detail(&detail, session);
        }
        Command::DeleteLesson { course_id, lesson_id, yes } => {
            confirm(yes, &format!("lesson {}", lesson_id))?;
            let detail = open_editable_course(&mut router, session, course_id).await?;
            if !detail.lessons.iter().any(|lesson| lesson.id == lesson_id) {
                return Err(rejected(format!("Lesson {} is not part of course {}.", lesson_id, course_id)));
            }
            router.token().run(LessonService::new(session).delete(lesson_id)).await?;

            println!("Lesson {} deleted.", lesson_id);
            let detail = router.token().run(CourseService::new(session).detail(course_id)).await?;
            print_course_detail(&detail, session);
        }
        Command::Enroll { course_id } => {
            router.navigate(View::Courses);
            current_screen(&mut router, session)?;

            let enrollment = EnrollmentService::new(session);
            if !enrollment.can_enroll() {
                return Err(rejected("Only students can enroll in courses."));
            }
            let token = router.token();
            let courses = token.run(CourseService::new(session).list()).await?;
            let course = courses
                .iter()
                .find(|course| course.id == course_id)
                .ok_or_else(|| rejected(format!("Course {} not found.", course_id)))?;

            let outcome = token.until_cancelled(enrollment.enroll(course)).await?;
            match outcome {
                EnrollmentOutcome::Enrolled | EnrollmentOutcome::AlreadyEnrolled => {
                    println!("{}\n{}", outcome.title(), outcome.message(course));
                }
                _ => return Err(rejected(format!("{}: {}", outcome.title(), outcome.message(course)))),
            }
        }
        Command::Enrollments => {
            router.navigate(View::MyEnrollments);
            if current_screen(&mut router, session)? != Screen::MyEnrollments {
                return Err(rejected("Only students have enrollments."));
            }
            let enrollments = router.token().run(EnrollmentService::new(session).my_enrollments()).await?;
            if enrollments.is_empty() {
                println!("You are not enrolled in any courses yet.");
            }
            for enrollment in &enrollments {
                print_enrollment(enrollment, false);
            }
        }
        Command::MyCourses => {
            router.navigate(View::MyCourses);
            if current_screen(&mut router, session)? != Screen::MyCourses {
                return Err(rejected("Only instructors have their own courses."));
            }
            let courses = router.token().run(InstructorService::new(session).my_courses()).await?;
            if courses.is_empty() {
                println!("You have not created any courses yet.");
            }
            for course in &courses {
                print_course_line(course);
            }
        }
        Command::Students { course_id } => {
            router.select_course(course_id, SelectMode::EnrolledStudents);
            if current_screen(&mut router, session)? != (Screen::CourseStudents { course_id }) {
                return Err(rejected("Only instructors can view enrolled students."));
            }
            let roster = router.token().run(InstructorService::new(session).roster(course_id)).await?;
            println!("{} - {} enrolled", roster.course.title, roster.enrollments.len());
            for enrollment in &roster.enrollments {
                print_enrollment(enrollment, true);
            }
        }
    }

    Ok(())
}

fn current_screen(router: &mut ViewRouter, session: &SessionContext) -> Result<Screen, CliError> {
    match router.resolve(&session.state()) {
        Screen::SignIn => Err(rejected("Not signed in. Run `learnhub login` first.")),
        Screen::Loading => Err(rejected("Session is still loading.")),
        screen => Ok(screen),
    }
}

/// Opens the course detail view and checks the user may change the course.
async fn open_editable_course(router: &mut ViewRouter, session: &SessionContext, course_id: i64) -> Result<CourseDetail, CliError> {
    router.select_course(course_id, SelectMode::Detail);
    current_screen(router, session)?;

    let detail = router.token().run(CourseService::new(session).detail(course_id)).await?;
    if !session.can_edit_course(&detail.course) {
        return Err(rejected("You can only change courses you teach."));
    }
    Ok(detail)
}

fn confirm(yes: bool, what: &str) -> Result<(), CliError> {
    if yes {
        Ok(())
    } else {
        Err(rejected(format!("Deleting {} cannot be undone. Re-run with --yes to confirm.", what)))
    }
}

async fn list_courses(router: &ViewRouter, session: &SessionContext) -> Result<(), CliError> {
    let courses = router.token().run(CourseService::new(session).list()).await?;
    if courses.is_empty() {
        println!("No courses available.");
    }
    for course in &courses {
        print_course_line(course);
    }
    Ok(())
}

fn print_course_line(course: &Course) {
    println!(
        "[{}] {} - {} ({} enrolled, created {})",
        course.id,
        course.title,
        course.instructor,
        course.enrolled_count,
        course.created_at.format("%b %-d, %Y")
    );
}

fn print_course_detail(detail: &CourseDetail, session: &SessionContext) {
    let course = &detail.course;
    print_course_line(course);
    if !course.description.is_empty() {
        println!("{}", course.description);
    }
    if session.can_edit_course(course) {
        println!("(you can edit this course)");
    }

    println!("{} lessons, {} minutes total", detail.lessons.len(), detail.total_duration());
    for (index, lesson) in detail.lessons.iter().enumerate() {
        print!("  {}. [{}] {} ({} min)", index + 1, lesson.id, lesson.title, lesson.duration);
        match &lesson.video_link {
            Some(link) => println!(" {}", link),
            None => println!(),
        }
    }
}

fn print_enrollment(enrollment: &Enrollment, show_student: bool) {
    let subject = if show_student {
        enrollment.student.label()
    } else {
        enrollment.course.label()
    };
    println!("{} - enrolled {}", subject, enrollment.enrolled_at.format("%b %-d, %Y"));
}
