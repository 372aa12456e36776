// ==========================================
// 家具 BOM 成本核算 - 国际化
// ==========================================
// 目录告警与复杂度描述的 zh-CN / en 文案
// 缺失键回退到 en（见 lib.rs 中的 i18n! 宏）
// ==========================================

use crate::domain::types::ComplexityLevel;

pub const SUPPORTED_LOCALES: [&str; 2] = ["en", "zh-CN"];

pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 切换语言；不支持的代码保持当前语言并返回 false
pub fn set_locale(locale: &str) -> bool {
    if !SUPPORTED_LOCALES.contains(&locale) {
        tracing::warn!(locale, "不支持的语言，保持 {}", current_locale());
        return false;
    }
    rust_i18n::set_locale(locale);
    true
}

pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译并替换 `%{name}` 占位符
///
/// ```no_run
/// use bom_costing::i18n::t_with_args;
/// let msg = t_with_args("warning.new_profile", &[("profile", "ALU-PROFILE-55x30x1.6")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    args.iter().fold(t(key), |msg, (k, v)| {
        msg.replace(&format!("%{{{}}}", k), v)
    })
}

pub fn complexity_label(level: ComplexityLevel) -> String {
    t(level.label_key())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // locale 为进程级全局状态，相关测试串行执行
    static LOCALE_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_unsupported_locale_is_ignored() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        assert!(set_locale("zh-CN"));
        assert!(!set_locale("vi"));
        assert_eq!(current_locale(), "zh-CN");
        set_locale("en");
    }

    #[test]
    fn test_new_profile_warning() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        let args = [("profile", "ALU-PROFILE-55x30x1.6")];

        set_locale("zh-CN");
        let msg = t_with_args("warning.new_profile", &args);
        assert!(msg.contains("ALU-PROFILE-55x30x1.6"));
        assert!(msg.contains("模具"));

        set_locale("en");
        let msg = t_with_args("warning.new_profile", &args);
        assert_eq!(
            msg,
            "New profile ALU-PROFILE-55x30x1.6 requires new extrusion tooling (~$10,000)"
        );
    }

    #[test]
    fn test_similar_profiles_fills_every_placeholder() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        let msg = t_with_args(
            "warning.similar_profiles",
            &[
                ("profile", "ALU-PROFILE-40x20x1.6"),
                ("similar", "ALU-PROFILE-40x20x1.7"),
            ],
        );
        assert!(!msg.contains("%{"));
        assert!(msg.ends_with("ALU-PROFILE-40x20x1.7"));
    }

    #[test]
    fn test_complexity_labels() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        assert_eq!(complexity_label(ComplexityLevel::Simple), "Simple");
        assert_eq!(complexity_label(ComplexityLevel::VeryComplex), "Very complex");
        set_locale("zh-CN");
        assert_eq!(complexity_label(ComplexityLevel::Moderate), "中等");
        set_locale("en");
    }
}
