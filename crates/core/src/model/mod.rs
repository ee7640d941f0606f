mod attempt;
mod ids;
mod level;
mod mode;
mod operator;
mod question;
mod session;
mod settings;
mod user;

pub use ids::{ParseIdError, SessionId, UserId};

pub use attempt::{Attempt, AttemptError};
pub use level::{Level, LevelError, LevelProfile, MAX_OPERAND_CAP};
pub use mode::{ModeParseError, QuizMode};
pub use operator::Operator;
pub use question::{OPTION_COUNT, Question, QuestionError};
pub use session::{EndReason, SessionState, SessionSummary, SessionSummaryError};
pub use settings::{QuizSettings, QuizSettingsDraft, SettingsError};
pub use user::{DISPLAY_NAME_MAX_CHARS, DisplayName, UserError, UserProfile, UserStats};
