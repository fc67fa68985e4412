//! 질문 템플릿 카탈로그
//!
//! 의문사(what/how/are-is/can/when/where/who/which/why)별로 묶인 고정
//! 템플릿 목록입니다. 플레이스홀더는 {term}, {action}, {category}, {value}
//! 네 종류이며, 생성기가 키 용어/행동 어휘/카테고리/수치 값으로 치환합니다.

/// 질문 템플릿 (치환 전 원문)
///
/// 어떤 플레이스홀더를 쓰는지는 본문 검사로 판별합니다.
pub const QUESTION_TEMPLATES: &[&str] = &[
    // What - 다양한 어미
    "What is {term}?",
    "What are {term}?",
    "What are the {term} limits?",
    "What are the {term} restrictions?",
    "What are the {term} procedures?",
    "What {term} must be met?",
    "What happens if I {action} {term}?",
    "What {term} are specified?",
    "What are the {term} standards?",
    "What {term} apply?",
    // How
    "How do I {action} {term}?",
    "How is {term} determined?",
    "How does {term} work?",
    "How long does {term} take?",
    "How are {term} monitored?",
    "How can I {action} {term}?",
    "How is {term} measured?",
    "How do {term} differ?",
    // Are/Is
    "Are there exceptions to {term}?",
    "Are {term} required?",
    "Is {term} allowed?",
    "Are {term} mandatory?",
    "Are there different {term} by {category}?",
    "Is {term} permitted?",
    "Are {term} necessary?",
    // Can
    "Can I {action} {term}?",
    "Can {term} be {action}?",
    "Can {term} exceed {value}?",
    // When
    "When is {term} required?",
    "When must {term} be {action}?",
    "When can I {action} {term}?",
    // Where
    "Where can I {action} {term}?",
    "Where are {term} allowed?",
    // Who
    "Who can {action} {term}?",
    "Who is responsible for {term}?",
    "Who must {action} {term}?",
    // Which
    "Which {term} apply?",
    "Which {term} are required?",
    // Why
    "Why are {term} necessary?",
];

/// {action} 치환용 고정 행동 어휘
pub const ACTIONS: &[&str] = &[
    "apply", "obtain", "get", "conduct", "perform", "operate", "comply", "meet", "use", "exceed",
    "violate",
];

/// 후보가 부족할 때 채우는 기본 후속 질문
pub const DEFAULT_FOLLOWUPS: &[&str] = &[
    "Can you provide more details?",
    "What are related regulations?",
    "Are there any exceptions?",
];

/// 인사말 목록 (소문자, 정확 일치 또는 접두 일치)
pub const GREETINGS: &[&str] = &[
    "hi",
    "hey",
    "hello",
    "good morning",
    "good afternoon",
    "good evening",
    "greetings",
    "howdy",
    "sup",
    "what's up",
    "how are you",
    "how do you do",
];

/// 인사말에 붙는 고정 후속 질문 3종
pub const GREETING_FOLLOWUPS: &[&str] = &[
    "What are weight limits for drones?",
    "What are the speed restrictions?",
    "How do I get a BVLOS permit?",
];

/// 템플릿의 패밀리 키 (첫 플레이스홀더 앞 접두)
///
/// 패밀리당 생성 인스턴스를 3개로 제한하는 데 쓰입니다.
pub fn template_family(template: &str) -> &str {
    template.split('{').next().unwrap_or(template)
}
