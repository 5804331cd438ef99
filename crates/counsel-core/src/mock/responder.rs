//! Canned counselling replies picked by keyword.

use std::cell::RefCell;
use std::sync::OnceLock;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Anxiety,
    Depression,
    Stress,
    Sleep,
    Relationships,
    Work,
    Greetings,
}

impl Category {
    pub fn pool(self) -> &'static [&'static str] {
        match self {
            Category::Anxiety => ANXIETY,
            Category::Depression => DEPRESSION,
            Category::Stress => STRESS,
            Category::Sleep => SLEEP,
            Category::Relationships => RELATIONSHIPS,
            Category::Work => WORK,
            Category::Greetings => GREETINGS,
        }
    }
}

/// Where a reply was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Source {
    Category(Category),
    General,
    Suggestions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub source: Source,
    pub text: &'static str,
}

// Emotional categories come before greetings: "你好，我很焦虑" is an anxiety message.
fn rules() -> &'static [(Category, Regex)] {
    static RULES: OnceLock<Vec<(Category, Regex)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (Category::Anxiety, "焦虑|紧张|担心|不安|害怕"),
            (Category::Depression, "抑郁|难过|伤心|沮丧|失落"),
            (Category::Stress, "压力|累|疲惫|忙"),
            (Category::Sleep, "失眠|睡不着|睡眠"),
            (Category::Relationships, "关系|朋友|家人|恋爱|分手"),
            (Category::Work, "工作|学习|考试"),
            (Category::Greetings, r"你好|您好|\bhello\b|\bhi\b"),
        ]
        .into_iter()
        .map(|(category, pattern)| (category, Regex::new(pattern).expect("static pattern")))
        .collect()
    })
}

pub struct KeywordResponder {
    rng: RefCell<SmallRng>,
}

impl Default for KeywordResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordResponder {
    pub fn new() -> Self {
        Self {
            rng: RefCell::new(SmallRng::from_entropy()),
        }
    }

    /// Deterministic picks, for tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: RefCell::new(SmallRng::seed_from_u64(seed)),
        }
    }

    /// First matching category, checked in priority order.
    pub fn classify(&self, message: &str) -> Option<Category> {
        let message = message.to_lowercase();
        rules()
            .iter()
            .find(|(_, re)| re.is_match(&message))
            .map(|(category, _)| *category)
    }

    pub fn respond(&self, message: &str) -> Reply {
        let source = match self.classify(message) {
            Some(category) => Source::Category(category),
            None if self.rng.borrow_mut().gen_bool(0.5) => Source::General,
            None => Source::Suggestions,
        };
        let pool = match source {
            Source::Category(category) => category.pool(),
            Source::General => GENERAL,
            Source::Suggestions => SUGGESTIONS,
        };
        Reply {
            source,
            text: self.pick(pool),
        }
    }

    /// Uniform delay in `[min_ms, max_ms]`.
    pub fn jitter(&self, min_ms: u64, max_ms: u64) -> u64 {
        if max_ms <= min_ms {
            return min_ms;
        }
        self.rng.borrow_mut().gen_range(min_ms..=max_ms)
    }

    fn pick(&self, pool: &'static [&'static str]) -> &'static str {
        let index = self.rng.borrow_mut().gen_range(0..pool.len());
        pool[index]
    }
}

// ─── Reply pools ─────────────────────────────────────────────

pub const GREETINGS: &[&str] = &[
    "你好！我是你的AI心理咨询助手，很高兴和你聊天。今天有什么想和我分享的吗？",
    "您好！欢迎来到这里。无论你现在的心情如何，我都愿意倾听。",
    "你好呀！今天过得怎么样？有什么想聊的都可以告诉我。",
];

pub const ANXIETY: &[&str] = &[
    "我能感受到你现在有些焦虑。试着做几次深呼吸：吸气四秒，屏住四秒，再慢慢呼出。",
    "焦虑是身体在提醒我们关注某些事情。能和我说说，是什么让你感到不安吗？",
    "担心的感觉很不好受。我们可以一起把让你紧张的事情拆开来看，一件一件处理。",
];

pub const DEPRESSION: &[&str] = &[
    "听起来你最近很难过，谢谢你愿意说出来。这种感受持续多久了？",
    "失落的时候，对自己温柔一些很重要。今天有没有哪怕一件小事让你感觉好一点？",
    "你的感受是真实而重要的。如果低落持续很久，寻求专业帮助也是一种勇敢。",
];

pub const STRESS: &[&str] = &[
    "压力大的时候，先给自己留一点喘息的时间。最近是什么让你感到最累？",
    "你已经承担了很多。试着列出手头的事情，分清哪些必须现在做，哪些可以放一放。",
    "疲惫是需要休息的信号。适当的运动和放松能帮助身体卸下压力。",
];

pub const SLEEP: &[&str] = &[
    "失眠真的很折磨人。睡前一小时放下手机，尝试固定的作息，可能会有帮助。",
    "睡不着的时候，不妨起身做些安静的事情，等有困意再回到床上。",
    "睡眠和情绪密切相关。最近入睡困难时，脑子里通常在想些什么？",
];

pub const RELATIONSHIPS: &[&str] = &[
    "人际关系中的困扰常常让人心累。能具体说说发生了什么吗？",
    "和重要的人之间出现问题时，表达自己的感受而不是指责，往往更容易被理解。",
    "分开或疏远都会带来失落感，给自己一些时间去消化这些情绪。",
];

pub const WORK: &[&str] = &[
    "工作和学习的压力很常见。你觉得最让你困扰的是任务本身，还是对结果的担心？",
    "考试前紧张是正常的。合理安排复习节奏，也别忘了休息。",
    "试着把大目标拆成小步骤，每完成一步都给自己一点肯定。",
];

pub const GENERAL: &[&str] = &[
    "我在认真听，能再多说一些吗？",
    "谢谢你的分享。这件事让你有什么样的感受？",
    "我理解你的感受。你希望接下来怎么做呢？",
];

pub const SUGGESTIONS: &[&str] = &[
    "也许可以试试每天写几句心情日记，帮助你更清楚地了解自己的情绪。",
    "适量运动、规律作息和与信任的人交流，都是照顾心理健康的好方法。",
    "如果困扰持续影响生活，建议考虑联系专业的心理咨询师。",
];
