//! DJ prompt construction and response cleanup

use super::BumperRequest;

/// Standing instructions for the text model
pub const DJ_SYSTEM_INSTRUCTION: &str = "You are a professional radio DJ. Generate ONLY the exact words you would say on air.
Rules:
- Keep it under 50 words (but shorter is fine - be natural, don't force it)
- Be energetic and conversational
- Mention the SPECIFIC song and artist that just played
- If topics are provided, share 1-2 UNIQUE interesting facts (never repeat the same facts)
- DO NOT make up facts about weather, time, news, or events
- DO NOT include instructions or meta-text
- Sound natural like a real DJ
- ALWAYS end with \"on your F M, your [genre(s)] station!\" or a variation like \"here on your F M!\"
- Write \"your F M\" NOT \"YOURFM\" for proper pronunciation
- Output ONLY what the DJ would say";

/// Topics that invite made-up facts
const UNVERIFIABLE_TOPIC_WORDS: [&str; 5] = ["weather", "news", "time", "date", "temperature"];

/// Words that betray a response echoing its instructions
const META_WORDS: [&str; 4] = ["prompt", "instruction", "create", "generate"];

/// Longest response spoken as-is
pub const MAX_RESPONSE_WORDS: usize = 55;

fn genres_phrase(request: &BumperRequest) -> String {
    let genres: Vec<&str> = request
        .genres
        .iter()
        .map(|g| g.trim())
        .filter(|g| !g.is_empty())
        .collect();
    if genres.is_empty() {
        "music".to_string()
    } else {
        genres.join(" and ")
    }
}

fn track_artist(request: &BumperRequest) -> &str {
    request
        .current_track_artist
        .as_deref()
        .filter(|a| !a.trim().is_empty())
        .unwrap_or("an amazing track")
}

fn track_name(request: &BumperRequest) -> &str {
    request.current_track_name.as_deref().unwrap_or("")
}

/// Topics to talk about, or `None` when they are empty or unverifiable
fn usable_topics(request: &BumperRequest) -> Option<String> {
    let topics: Vec<&str> = request
        .topics
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if topics.is_empty() {
        return None;
    }

    let lowered = topics.join(" ").to_lowercase();
    if UNVERIFIABLE_TOPIC_WORDS.iter().any(|w| lowered.contains(w)) {
        return None;
    }
    Some(topics.join(", "))
}

fn next_up(request: &BumperRequest) -> Option<(&str, &str)> {
    let name = request.next_track_name.as_deref().filter(|n| !n.trim().is_empty())?;
    let artist = request.next_track_artist.as_deref().filter(|a| !a.trim().is_empty())?;
    Some((name, artist))
}

/// User prompt for one bumper
///
/// One of four shapes, depending on whether usable topics and a fully known
/// next track are present.
pub fn build_prompt(request: &BumperRequest) -> String {
    let artist = track_artist(request);
    let opener = format!("You just played '{}' by {}.", track_name(request), artist);
    let closer = format!(
        "End with 'on your F M, your {} station!' or similar.",
        genres_phrase(request)
    );

    let body = match (usable_topics(request), next_up(request)) {
        (Some(topics), Some((name, next_artist))) => format!(
            "Share a unique interesting fact about: {} for {}. Then mention '{}' by {} is coming up next.",
            topics, artist, name, next_artist
        ),
        (Some(topics), None) => format!(
            "Share a unique interesting fact about: {} for {}. Then hype what's next.",
            topics, artist
        ),
        (None, Some((name, next_artist))) => format!(
            "Say something energetic, then announce '{}' by {} is up next.",
            name, next_artist
        ),
        (None, None) => "Say something energetic and hype what's next.".to_string(),
    };

    format!("{} {} {}", opener, body, closer)
}

/// Spoken fallback when the model response is unusable
pub fn template_text(request: &BumperRequest) -> String {
    format!(
        "That was {} with {}! Stay tuned for more hits on your F M, your {} station!",
        track_artist(request),
        track_name(request),
        genres_phrase(request)
    )
}

/// Strip whitespace and quotes; fall back to the template on long or meta text
pub fn sanitize_response(raw: &str, request: &BumperRequest) -> String {
    let text = raw.trim().trim_matches('"').trim_matches('\'').trim();

    let lowered = text.to_lowercase();
    let too_long = text.split_whitespace().count() > MAX_RESPONSE_WORDS;
    let meta = META_WORDS.iter().any(|w| lowered.contains(w));

    if text.is_empty() || too_long || meta {
        tracing::warn!(too_long, meta, "Unusable bumper text, using template");
        return template_text(request);
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> BumperRequest {
        BumperRequest {
            station_id: "s1".to_string(),
            topics: vec!["band history".to_string()],
            genres: vec!["rock".to_string(), "metal".to_string()],
            artists: vec![],
            voice_id: "v1".to_string(),
            current_track_name: Some("Schism".to_string()),
            current_track_artist: Some("Tool".to_string()),
            next_track_name: Some("Blackwater Park".to_string()),
            next_track_artist: Some("Opeth".to_string()),
        }
    }

    #[test]
    fn test_prompt_with_topics_and_next_track() {
        assert_eq!(
            build_prompt(&request()),
            "You just played 'Schism' by Tool. Share a unique interesting fact about: band history for Tool. \
             Then mention 'Blackwater Park' by Opeth is coming up next. \
             End with 'on your F M, your rock and metal station!' or similar."
        );
    }

    #[test]
    fn test_prompt_with_topics_only() {
        let mut req = request();
        req.next_track_name = None;
        assert_eq!(
            build_prompt(&req),
            "You just played 'Schism' by Tool. Share a unique interesting fact about: band history for Tool. \
             Then hype what's next. End with 'on your F M, your rock and metal station!' or similar."
        );
    }

    #[test]
    fn test_prompt_with_next_track_only() {
        let mut req = request();
        req.topics.clear();
        assert_eq!(
            build_prompt(&req),
            "You just played 'Schism' by Tool. Say something energetic, then announce 'Blackwater Park' by Opeth is up next. \
             End with 'on your F M, your rock and metal station!' or similar."
        );
    }

    #[test]
    fn test_prompt_without_topics_or_next_track() {
        let mut req = request();
        req.topics.clear();
        req.next_track_artist = None;
        assert_eq!(
            build_prompt(&req),
            "You just played 'Schism' by Tool. Say something energetic and hype what's next. \
             End with 'on your F M, your rock and metal station!' or similar."
        );
    }

    #[test]
    fn test_unverifiable_topics_are_ignored() {
        for topic in ["Today's weather", "latest news", "tour dates", "showtime"] {
            let mut req = request();
            req.topics = vec![topic.to_string()];
            let prompt = build_prompt(&req);
            assert!(!prompt.contains("fact about"), "topic {:?} was used", topic);
            assert!(prompt.contains("Say something energetic, then announce"));
        }
    }

    #[test]
    fn test_next_track_needs_name_and_artist() {
        let mut req = request();
        req.next_track_artist = None;
        let prompt = build_prompt(&req);
        assert!(!prompt.contains("coming up next"));
        assert!(prompt.contains("Then hype what's next."));
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let mut req = request();
        req.genres.clear();
        req.current_track_artist = None;
        assert!(build_prompt(&req).contains("by an amazing track."));
        assert!(template_text(&req).ends_with("your F M, your music station!"));
    }

    #[test]
    fn test_sanitize_strips_quotes() {
        assert_eq!(
            sanitize_response("  \"Tool, everybody! Right here on your F M!\"\n", &request()),
            "Tool, everybody! Right here on your F M!"
        );
        assert_eq!(sanitize_response("'Short and sweet.'", &request()), "Short and sweet.");
    }

    #[test]
    fn test_sanitize_rejects_long_text() {
        let long = vec!["rock"; MAX_RESPONSE_WORDS + 1].join(" ");
        assert_eq!(sanitize_response(&long, &request()), template_text(&request()));

        let at_limit = vec!["rock"; MAX_RESPONSE_WORDS].join(" ");
        assert_eq!(sanitize_response(&at_limit, &request()), at_limit);
    }

    #[test]
    fn test_sanitize_rejects_meta_text() {
        assert_eq!(
            sanitize_response("I will create a bumper for you", &request()),
            "That was Tool with Schism! Stay tuned for more hits on your F M, your rock and metal station!"
        );
    }
}
