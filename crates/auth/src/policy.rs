use crate::error::{AuthError, Result};
use crate::hash::{hash_password, verify_password};
use crate::oids;
use chrono::{DateTime, Utc};
use directoryd_store::Entry;

/// Where a given DN sits in the password-policy state machine. `Normal` and
/// `Grace` both permit bind; the others do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordPolicyState {
    Normal,
    Locked,
    Grace { remaining: u32 },
    Expired,
    ResetRequired,
}

/// Per-partition password-policy configuration, analogous to a
/// `pwdPolicy` subentry's operational defaults.
#[derive(Debug, Clone)]
pub struct PasswordPolicyConfig {
    pub enabled: bool,
    pub pwd_max_failure: u32,
    pub pwd_lockout_duration: chrono::Duration,
    pub pwd_max_age: Option<chrono::Duration>,
    pub pwd_min_age: chrono::Duration,
    pub pwd_expire_warning: chrono::Duration,
    pub pwd_in_history: usize,
    pub pwd_grace_login_limit: u32,
    pub pwd_min_length: usize,
    pub pwd_max_length: Option<usize>,
    pub pwd_must_change: bool,
}

impl Default for PasswordPolicyConfig {
    fn default() -> Self {
        PasswordPolicyConfig {
            enabled: true,
            pwd_max_failure: 3,
            pwd_lockout_duration: chrono::Duration::minutes(30),
            pwd_max_age: None,
            pwd_min_age: chrono::Duration::zero(),
            pwd_expire_warning: chrono::Duration::days(7),
            pwd_in_history: 5,
            pwd_grace_login_limit: 0,
            pwd_min_length: 8,
            pwd_max_length: None,
            pwd_must_change: false,
        }
    }
}

fn times(entry: &Entry, oid: &str) -> Vec<DateTime<Utc>> {
    entry
        .get(oid)
        .map(|vs| {
            vs.iter()
                .filter_map(|v| parse_generalized_time(&String::from_utf8_lossy(v)))
                .collect()
        })
        .unwrap_or_default()
}

fn set_times(entry: &mut Entry, oid: &str, ts: &[DateTime<Utc>]) {
    if ts.is_empty() {
        entry.attrs.remove(oid);
    } else {
        entry.attrs.insert(
            oid.to_string(),
            ts.iter().map(|t| render_generalized_time(*t).into_bytes()).collect(),
        );
    }
}

/// Formats as RFC 4517 `GeneralizedTime`, e.g. `20260729120000Z`.
pub fn render_generalized_time(t: DateTime<Utc>) -> String {
    t.format("%Y%m%d%H%M%SZ").to_string()
}

pub fn parse_generalized_time(s: &str) -> Option<DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(s.trim_end_matches('Z'), "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn is_reset(entry: &Entry) -> bool {
    match entry.get(oids::PWD_RESET).and_then(|v| v.first()) {
        Some(v) => match std::str::from_utf8(v) {
            Ok("TRUE") => true,
            Ok("FALSE") => false,
            other => {
                tracing::warn!(value = ?other, "non-canonical pwdReset value, treating as FALSE");
                false
            }
        },
        None => false,
    }
}

fn set_reset(entry: &mut Entry, value: bool) {
    if value {
        entry.attrs.insert(oids::PWD_RESET.to_string(), vec![b"TRUE".to_vec()]);
    } else {
        entry.attrs.remove(oids::PWD_RESET);
    }
}

/// Computes the entry's current state without mutating it.
pub fn state_of(entry: &Entry, cfg: &PasswordPolicyConfig, now: DateTime<Utc>) -> PasswordPolicyState {
    if !cfg.enabled {
        return PasswordPolicyState::Normal;
    }
    if is_reset(entry) {
        return PasswordPolicyState::ResetRequired;
    }
    if let Some(locked) = times(entry, oids::PWD_ACCOUNT_LOCKED_TIME).first() {
        if now - *locked < cfg.pwd_lockout_duration {
            return PasswordPolicyState::Locked;
        }
    }
    if let Some(max_age) = cfg.pwd_max_age {
        if let Some(changed) = times(entry, oids::PWD_CHANGED_TIME).first() {
            if now - *changed >= max_age {
                let used = times(entry, oids::PWD_GRACE_USE_TIME).len() as u32;
                return if used < cfg.pwd_grace_login_limit {
                    PasswordPolicyState::Grace { remaining: cfg.pwd_grace_login_limit - used }
                } else {
                    PasswordPolicyState::Expired
                };
            }
        }
    }
    PasswordPolicyState::Normal
}

/// Verifies `candidate` against the entry's `userPassword`, folding in
/// lockout/expiry/reset gates. On success, updates `pwdLastSuccess` and
/// clears failure/lockout bookkeeping; on failure, appends to
/// `pwdFailureTime` and locks the account if the threshold is reached.
pub fn check_bind(entry: &mut Entry, cfg: &PasswordPolicyConfig, candidate: &[u8], now: DateTime<Utc>) -> Result<()> {
    let state = match state_of(entry, cfg, now) {
        PasswordPolicyState::Locked => return Err(AuthError::AccountLocked),
        PasswordPolicyState::Expired => return Err(AuthError::PasswordExpired),
        s => s,
    };

    let stored = entry
        .get(oids::USER_PASSWORD)
        .and_then(|v| v.first())
        .map(|v| String::from_utf8_lossy(v).into_owned());
    let ok = stored.as_deref().map(|s| verify_password(candidate, s)).unwrap_or(false);

    if !ok {
        record_failure(entry, cfg, now);
        return Err(AuthError::InvalidCredentials);
    }

    if let PasswordPolicyState::Grace { .. } = state {
        let mut used = times(entry, oids::PWD_GRACE_USE_TIME);
        used.push(now);
        set_times(entry, oids::PWD_GRACE_USE_TIME, &used);
    }
    record_success(entry, now);
    Ok(())
}

fn record_failure(entry: &mut Entry, cfg: &PasswordPolicyConfig, now: DateTime<Utc>) {
    let mut failures = times(entry, oids::PWD_FAILURE_TIME);
    failures.retain(|t| now - *t < cfg.pwd_lockout_duration);
    failures.push(now);
    let locked = failures.len() as u32 >= cfg.pwd_max_failure;
    set_times(entry, oids::PWD_FAILURE_TIME, &failures);
    if locked {
        set_times(entry, oids::PWD_ACCOUNT_LOCKED_TIME, &[now]);
    }
}

fn record_success(entry: &mut Entry, now: DateTime<Utc>) {
    set_times(entry, oids::PWD_LAST_SUCCESS, &[now]);
    set_times(entry, oids::PWD_FAILURE_TIME, &[]);
    set_times(entry, oids::PWD_ACCOUNT_LOCKED_TIME, &[]);
}

/// Runs quality checks, history comparison, and the minimum-age gate, then
/// commits the new password and rotates history. `is_admin` controls whether
/// `pwdMustChange` forces `pwdReset` on the target entry.
pub fn change_password(
    entry: &mut Entry,
    cfg: &PasswordPolicyConfig,
    username_hint: &str,
    old: Option<&[u8]>,
    new: &[u8],
    now: DateTime<Utc>,
    is_admin: bool,
) -> Result<()> {
    check_quality(new, cfg, username_hint)?;

    if let Some(changed) = times(entry, oids::PWD_CHANGED_TIME).first() {
        if now - *changed < cfg.pwd_min_age && !is_admin {
            return Err(AuthError::PasswordTooYoung);
        }
    }

    if !is_admin {
        let Some(old) = old else {
            return Err(AuthError::MustSupplyOldPassword);
        };
        if let Some(stored) = entry.get(oids::USER_PASSWORD).and_then(|v| v.first()) {
            if !verify_password(old, &String::from_utf8_lossy(stored)) {
                return Err(AuthError::InvalidCredentials);
            }
        }
    }

    let mut history: Vec<String> = entry
        .get(oids::PWD_HISTORY)
        .map(|v| v.iter().map(|b| String::from_utf8_lossy(b).into_owned()).collect())
        .unwrap_or_default();
    if history.iter().any(|h| verify_password(new, h)) {
        return Err(AuthError::PasswordInHistory);
    }

    let new_hash = hash_password(new);
    history.push(new_hash.clone());
    if history.len() > cfg.pwd_in_history {
        let overflow = history.len() - cfg.pwd_in_history;
        history.drain(0..overflow);
    }

    entry.attrs.insert(oids::USER_PASSWORD.to_string(), vec![new_hash.into_bytes()]);
    entry.attrs.insert(
        oids::PWD_HISTORY.to_string(),
        history.into_iter().map(String::into_bytes).collect(),
    );
    set_times(entry, oids::PWD_CHANGED_TIME, &[now]);
    set_times(entry, oids::PWD_GRACE_USE_TIME, &[]);
    set_reset(entry, cfg.pwd_must_change && is_admin);
    Ok(())
}

fn check_quality(new: &[u8], cfg: &PasswordPolicyConfig, username_hint: &str) -> Result<()> {
    if new.len() < cfg.pwd_min_length {
        return Err(AuthError::PasswordTooShort);
    }
    if let Some(max) = cfg.pwd_max_length {
        if new.len() > max {
            return Err(AuthError::PasswordTooLong);
        }
    }
    let as_str = String::from_utf8_lossy(new);
    if !username_hint.is_empty() && as_str.to_lowercase().contains(&username_hint.to_lowercase()) {
        return Err(AuthError::InsufficientPasswordQuality);
    }
    let has_lower = as_str.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = as_str.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = as_str.chars().any(|c| c.is_ascii_digit());
    let has_symbol = as_str.chars().any(|c| !c.is_ascii_alphanumeric());
    let classes = [has_lower, has_upper, has_digit, has_symbol].iter().filter(|b| **b).count();
    if classes < 2 {
        return Err(AuthError::InsufficientPasswordQuality);
    }
    Ok(())
}

/// `true` while the change-after-reset gate should block every operation on
/// this DN other than bind/modify-password/unbind/abandon/StartTLS.
pub fn is_pwd_must_reset(entry: &Entry) -> bool {
    is_reset(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(
            chrono::NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, s).unwrap(),
            Utc,
        )
    }

    #[test]
    fn generalized_time_round_trips() {
        let t = dt(2026, 7, 29, 12, 0, 0);
        assert_eq!(parse_generalized_time(&render_generalized_time(t)), Some(t));
    }

    #[test]
    fn third_consecutive_failure_locks_the_account() {
        let cfg = PasswordPolicyConfig { pwd_max_failure: 3, ..Default::default() };
        let mut entry = Entry::default();
        entry
            .attrs
            .insert(oids::USER_PASSWORD.to_string(), vec![hash_password(b"correct").into_bytes()]);
        let now = dt(2026, 7, 29, 12, 0, 0);
        for _ in 0..2 {
            assert!(check_bind(&mut entry, &cfg, b"wrong", now).is_err());
            assert_eq!(state_of(&entry, &cfg, now), PasswordPolicyState::Normal);
        }
        assert!(check_bind(&mut entry, &cfg, b"wrong", now).is_err());
        assert_eq!(state_of(&entry, &cfg, now), PasswordPolicyState::Locked);
        assert!(matches!(check_bind(&mut entry, &cfg, b"correct", now), Err(AuthError::AccountLocked)));
    }

    #[test]
    fn lockout_clears_once_the_window_elapses() {
        let cfg = PasswordPolicyConfig { pwd_max_failure: 1, ..Default::default() };
        let mut entry = Entry::default();
        entry
            .attrs
            .insert(oids::USER_PASSWORD.to_string(), vec![hash_password(b"correct").into_bytes()]);
        let t0 = dt(2026, 7, 29, 12, 0, 0);
        assert!(check_bind(&mut entry, &cfg, b"wrong", t0).is_err());
        assert_eq!(state_of(&entry, &cfg, t0), PasswordPolicyState::Locked);
        let later = t0 + cfg.pwd_lockout_duration + chrono::Duration::seconds(1);
        assert_eq!(state_of(&entry, &cfg, later), PasswordPolicyState::Normal);
        assert!(check_bind(&mut entry, &cfg, b"correct", later).is_ok());
    }

    #[test]
    fn change_password_rejects_a_value_found_in_history() {
        let cfg = PasswordPolicyConfig { pwd_in_history: 2, pwd_min_length: 4, ..Default::default() };
        let mut entry = Entry::default();
        entry
            .attrs
            .insert(oids::USER_PASSWORD.to_string(), vec![hash_password(b"firstpass").into_bytes()]);
        let t0 = dt(2026, 1, 1, 0, 0, 0);
        change_password(&mut entry, &cfg, "bob", Some(b"firstpass"), b"secondpass", t0, false).unwrap();
        let t1 = t0 + chrono::Duration::days(1);
        let result = change_password(&mut entry, &cfg, "bob", Some(b"secondpass"), b"firstpass", t1, false);
        assert!(matches!(result, Err(AuthError::PasswordInHistory)));
    }

    #[test]
    fn change_password_enforces_minimum_age() {
        let cfg = PasswordPolicyConfig {
            pwd_min_age: chrono::Duration::days(1),
            pwd_min_length: 4,
            ..Default::default()
        };
        let mut entry = Entry::default();
        entry
            .attrs
            .insert(oids::USER_PASSWORD.to_string(), vec![hash_password(b"firstpass").into_bytes()]);
        let t0 = dt(2026, 1, 1, 0, 0, 0);
        change_password(&mut entry, &cfg, "bob", Some(b"firstpass"), b"secondpass", t0, false).unwrap();
        let soon = t0 + chrono::Duration::minutes(5);
        let result = change_password(&mut entry, &cfg, "bob", Some(b"secondpass"), b"thirdpassword", soon, false);
        assert!(matches!(result, Err(AuthError::PasswordTooYoung)));
    }

    #[test]
    fn admin_reset_sets_pwd_reset_and_blocks_state_until_changed() {
        let cfg = PasswordPolicyConfig { pwd_must_change: true, pwd_min_length: 4, ..Default::default() };
        let mut entry = Entry::default();
        entry
            .attrs
            .insert(oids::USER_PASSWORD.to_string(), vec![hash_password(b"firstpass").into_bytes()]);
        let t0 = dt(2026, 1, 1, 0, 0, 0);
        change_password(&mut entry, &cfg, "bob", None, "adminset1".as_bytes(), t0, true).unwrap();
        assert!(is_pwd_must_reset(&entry));
        assert_eq!(state_of(&entry, &cfg, t0), PasswordPolicyState::ResetRequired);
        let t1 = t0 + chrono::Duration::days(1);
        change_password(&mut entry, &cfg, "bob", Some(b"adminset1"), b"userchosen1", t1, false).unwrap();
        assert!(!is_pwd_must_reset(&entry));
        assert_eq!(state_of(&entry, &cfg, t1), PasswordPolicyState::Normal);
    }
}
