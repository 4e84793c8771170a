//! Sample feedback for local development and demos.

use chrono::Duration;
use rusqlite::Connection;
use uuid::Uuid;

use crate::models::db_operations::{feedback_db_operations, now};
use crate::models::{Category, FeedbackRecord, FeedbackStatus, Reply};
use crate::setup::db_setup::SetupError;

use Category::*;
use FeedbackStatus::*;

struct SampleFeedback {
    title: &'static str,
    content: &'static str,
    category: Category,
    tags: &'static [&'static str],
    status: FeedbackStatus,
}

const fn sample(
    title: &'static str,
    content: &'static str,
    category: Category,
    tags: &'static [&'static str],
    status: FeedbackStatus,
) -> SampleFeedback {
    SampleFeedback { title, content, category, tags, status }
}

const SAMPLE_REPLY: &str =
    "Thank you for your feedback. We are looking into this matter and will update you soon.";

const SAMPLES: &[SampleFeedback] = &[
    sample("Canteen Food Quality Needs Improvement", "The food quality in the canteen has been declining. The prices are also quite high for the quality provided. Please look into this matter.", Canteen, &["food", "quality", "pricing"], Open),
    sample("Library Opening Hours Extension Request", "The library closes too early. Students need more time to study, especially during exam season. Request to extend library hours.", Academics, &["library", "hours", "study"], Open),
    sample("Hostel WiFi Connection Issues", "The WiFi in the hostel is very slow and frequently disconnects. This affects our online classes and assignments.", Hostel, &["wifi", "internet", "connectivity"], InProgress),
    sample("Parking Space Insufficient", "There are not enough parking spaces for students. Many students have to park outside the campus which is not safe.", Infrastructure, &["parking", "safety"], Open),
    sample("Bus Service Timing Issues", "The college bus service is not punctual. Students often miss classes due to bus delays.", Transport, &["bus", "timing", "punctuality"], Open),
    sample("Canteen Menu Diversity", "The canteen menu is very limited. Please add more vegetarian and healthy options.", Canteen, &["menu", "vegetarian", "health"], Resolved),
    sample("Assignment Submission Portal Down", "The online assignment submission portal has been down for 2 days. Please fix this urgently.", Academics, &["portal", "assignment", "urgent"], Resolved),
    sample("Hostel Water Supply Problem", "There is irregular water supply in the hostel. Water often runs out during morning hours.", Hostel, &["water", "supply"], InProgress),
    sample("Lab Equipment Maintenance", "Many computers in the computer lab are not working. They need repair or replacement.", Infrastructure, &["lab", "computers", "maintenance"], Open),
    sample("Transport Fare Increase", "The bus fare was increased without prior notice. Many students are facing financial difficulties.", Transport, &["fare", "pricing"], Open),
    sample("Canteen Queue Management", "Long queues during lunch hours. Request to add more counters or improve service speed.", Canteen, &["queue", "service"], Open),
    sample("Course Material Availability", "Study materials for some courses are not available in the library. Please restock them.", Academics, &["library", "materials", "books"], Open),
    sample("Hostel Security Concerns", "Security measures in the hostel need improvement. There have been incidents of unauthorized entry.", Hostel, &["security", "safety"], Closed),
    sample("Classroom Projector Issues", "Many classroom projectors are not working properly. This affects teaching quality.", Infrastructure, &["projector", "classroom"], InProgress),
    sample("Bus Route Optimization", "The bus route does not cover all residential areas. Please add more pickup points.", Transport, &["route", "pickup"], Open),
    sample("Canteen Hygiene Standards", "Canteen hygiene needs improvement. Please ensure proper cleaning and food safety measures.", Canteen, &["hygiene", "safety"], Resolved),
    sample("Exam Schedule Clarity", "Exam schedules are announced very late. Students need more time to prepare.", Academics, &["exam", "schedule"], Open),
    sample("Hostel Room Maintenance", "Many hostel rooms need maintenance. Leaks, broken fans, and other issues need immediate attention.", Hostel, &["maintenance", "rooms"], InProgress),
    sample("Sports Facilities Upgrade", "The sports facilities are outdated. Request for upgrade and maintenance of sports equipment.", Infrastructure, &["sports", "facilities"], Open),
    sample("Bus Safety Measures", "Bus drivers sometimes drive recklessly. Please ensure proper safety measures and driver training.", Transport, &["safety", "drivers"], Open),
    sample("Canteen Payment Methods", "Please add digital payment options in the canteen. Cash transactions are inconvenient.", Canteen, &["payment", "digital"], Resolved),
    sample("Faculty Availability", "Faculty members are not available during office hours. Students face difficulty in getting guidance.", Academics, &["faculty", "office hours"], Open),
    sample("Hostel Common Area Facilities", "The common areas in hostel need better furniture and facilities for students to relax and study.", Hostel, &["common area", "facilities"], Open),
    sample("Campus WiFi Coverage", "WiFi coverage is poor in some areas of the campus. Please improve network coverage.", Infrastructure, &["wifi", "network"], InProgress),
    sample("Transport Timetable", "Please publish a clear timetable for bus services. Students need to plan their commute.", Transport, &["timetable", "schedule"], Resolved),
    sample("Canteen Student Discount", "Request for student discount on canteen items. This will help students with limited budgets.", Canteen, &["discount", "pricing"], Open),
    sample("Online Lecture Recordings", "Please provide recordings of online lectures for students who miss classes or want to review.", Academics, &["lectures", "recordings"], Open),
    sample("Hostel Laundry Services", "The laundry service in hostel is expensive and slow. Please improve or provide alternatives.", Hostel, &["laundry", "services"], Open),
    sample("Building Accessibility", "Some buildings are not accessible for students with disabilities. Please install ramps and elevators.", Infrastructure, &["accessibility", "disability"], Open),
    sample("Bus Capacity Issues", "Buses are often overcrowded. Please add more buses or increase frequency during peak hours.", Transport, &["capacity", "crowding"], Open),
];

pub fn sample_count() -> usize {
    SAMPLES.len()
}

/// Inserts the sample set in one transaction and returns how many records
/// were written. Every third sample that is no longer open gets a public
/// reply from two days ago. With `reset`, existing feedback is removed first.
pub fn seed_feedback(conn: &mut Connection, reset: bool) -> Result<usize, SetupError> {
    let tx = conn.transaction()?;

    if reset {
        let removed = feedback_db_operations::delete_all_feedback(&tx)?;
        println!("- Removed {} existing feedback entries.", removed);
    }

    let seeded_at = now();
    let reply_at = seeded_at - Duration::days(2);

    for (index, item) in SAMPLES.iter().enumerate() {
        // Spread creation times so the newest-first listing follows the list order.
        let created_at = seeded_at - Duration::days(3) - Duration::hours(index as i64);
        let replies = if index % 3 == 0 && item.status != Open {
            vec![Reply { message: SAMPLE_REPLY.to_string(), public: true, created_at: reply_at }]
        } else {
            Vec::new()
        };
        let updated_at = replies.last().map_or(created_at, |r| r.created_at);

        let record = FeedbackRecord {
            id: Uuid::new_v4(),
            title: item.title.to_string(),
            content: item.content.to_string(),
            category: item.category,
            tags: item.tags.iter().map(|t| t.to_string()).collect(),
            contact_email: None,
            status: item.status,
            is_public: true,
            replies,
            created_at,
            updated_at,
        };
        feedback_db_operations::insert_feedback(&tx, &record)?;
    }

    tx.commit()?;
    Ok(SAMPLES.len())
}
