pub mod attendance;
pub mod classroom;
pub mod course;
pub mod enrollment;
pub mod offering;
pub mod student;
pub mod teacher;
pub mod version;

pub use attendance::AttendanceRecord;
pub use classroom::{Classroom, NewClassroomRequest};
pub use course::{Course, NewCourseRequest};
pub use enrollment::{EnrollmentRecord, EnrollmentRecordRow, EnrollmentRequest};
pub use offering::{
    ClassOffering, ClassOfferingRow, DayOfWeek, NewOfferingRequest, OfferingStatus,
    ScheduleBlock, UpdateOfferingRequest,
};
pub use student::{NewStudentRequest, Student};
pub use teacher::{NewTeacherRequest, Teacher, TeacherRow};
pub use version::{NewVersionRequest, TimetableVersion, UpdateVersionRequest};
