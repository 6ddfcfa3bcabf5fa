//! Demo content for an empty database.

use chrono::{Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use rusqlite::Connection;

use crate::db::SqliteFeed;
use crate::feed::{Campus, FeedLimits, FeedResult, MediaKind, MediaRef, NewPost, ReactionKind};

const DEMO_USERS: usize = 50;
const DEMO_POSTS: usize = 80;

const CONFESSIONS: &[&str] = &[
    "Just realized I've been pronouncing 'epitome' wrong my entire life. Said it out loud in class today and everyone looked at me weird 😅",
    "The canteen uncle always gives me extra samosas when I smile. Small wins that make college life better ❤️",
    "Pulled an all-nighter for an assignment, submitted it at 11:59 PM, and got an A+. Sometimes procrastination pays off!",
    "Had a crush on someone for 3 years, finally confessed, and they said they felt the same way. College romance is real! 💕",
    "Failed my first semester, thought about dropping out, but my friends encouraged me to continue. Now I'm in my final year with decent grades. Never give up!",
    "The library has become my second home. I know every corner, every good study spot, and even which floors have the best WiFi.",
    "Accidentally attended the wrong class for an entire week because it was in my usual classroom. The professor never said anything 🤡",
    "Made my first real friend in college today after being lonely for months. Sometimes it takes time, but it's worth the wait.",
    "The mess food isn't that bad if you know what to order. Pro tip: Thursday's biryani is actually decent!",
    "Cried in the bathroom after a particularly tough viva. College can be overwhelming, but we're all in this together.",
    "Found out my roommate has been using my shampoo for months. We had the most awkward conversation about personal hygiene ever.",
    "The campus at night hits different. It's peaceful and makes you reflect on life and your goals.",
    "Bunked classes for the first time ever to watch a movie. Felt like a rebel, but also guilty the entire time 😂",
    "My parents still think I'm the studious kid from school. If only they knew about my weekend adventures...",
    "The placement season stress is real. Everyone's pretending to have it together while internally panicking.",
];

const ACTIVITIES: &[&str] = &[
    "Movie night at the hostel common room - who's bringing the popcorn?",
    "Late night cricket match at the ground. Bring your own bat!",
    "Study group for tomorrow's quiz. Let's suffer together 📚",
    "Anyone up for a midnight food run to the nearest dhaba?",
    "Gaming tournament in my room - FIFA and Call of Duty. Winner gets free dinner!",
    "Photography walk around campus during golden hour 📸",
    "Jam session at the music room. Bring your instruments!",
    "Group workout at the gym. Motivation needed!",
    "Coding hackathon prep session. Let's build something cool!",
    "Campus treasure hunt - I've hidden clues around the library!",
];

const COMMENTS: &[&str] = &[
    "This is so relatable! 😭",
    "I felt this on a spiritual level",
    "Same energy tbh",
    "We've all been there",
    "This hits different at 2 AM",
    "Big mood",
    "I'm not crying, you're crying",
    "This is why I love our college",
    "Facts 💯",
    "Too real",
    "I needed to hear this today",
    "Sending virtual hugs 🤗",
    "You're not alone in this",
    "This made my day better",
    "So wholesome ❤️",
];

/// What [`seed_demo`] wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub posts: usize,
}

/// Fill an empty database with demo accounts and posts. Does nothing when
/// any post already exists.
pub fn seed_demo<R: Rng + ?Sized>(
    conn: &mut Connection,
    limits: FeedLimits,
    rng: &mut R,
) -> FeedResult<SeedReport> {
    let mut feed = SqliteFeed::new(conn, limits);
    if feed.post_count()? > 0 {
        tracing::info!("database already has posts, skipping demo seed");
        return Ok(SeedReport::default());
    }

    let mut users = Vec::with_capacity(DEMO_USERS);
    for n in 0..DEMO_USERS {
        let (user, _) = feed.find_or_create_user(&format!("demo{}@campusfeed.local", n))?;
        users.push(user);
    }

    let now = Utc::now();
    for index in 0..DEMO_POSTS {
        let author = &users[rng.gen_range(0..users.len())];
        let campus = Campus::ALL[rng.gen_range(0..Campus::ALL.len())];
        let is_community = rng.gen_bool(0.2);

        let pool = if is_community { ACTIVITIES } else { CONFESSIONS };
        let text = pool[rng.gen_range(0..pool.len())];
        let mut draft = if is_community {
            NewPost::community(text, campus)
        } else {
            NewPost::confession(text, campus)
        };
        if rng.gen_bool(0.3) {
            let kind = if rng.gen_bool(0.7) {
                MediaKind::Image
            } else {
                MediaKind::Video
            };
            draft = draft.with_media(MediaRef {
                url: format!("https://picsum.photos/800/600?random={}", index),
                kind,
            });
        }

        let age = Duration::seconds(rng.gen_range(0..30 * 24 * 3600));
        let post = feed.create_post_at(author, draft, now - age)?;

        let reactors = rng.gen_range(0..20);
        for reactor in users.choose_multiple(rng, reactors) {
            let kind = ReactionKind::ALL[rng.gen_range(0..ReactionKind::ALL.len())];
            feed.toggle_reaction(&post.id, &reactor.id, kind, None)?;
        }

        for _ in 0..rng.gen_range(0..15) {
            let commenter = &users[rng.gen_range(0..users.len())];
            let text = COMMENTS[rng.gen_range(0..COMMENTS.len())];
            // within the last week, never before the post itself
            let written = now - Duration::seconds(rng.gen_range(0..7 * 24 * 3600));
            let written = written.max(post.created_at);
            feed.add_comment_at(&post.id, commenter, text, None, written)?;
        }
    }

    tracing::info!(users = users.len(), posts = DEMO_POSTS, "demo data seeded");
    Ok(SeedReport {
        users: users.len(),
        posts: DEMO_POSTS,
    })
}
