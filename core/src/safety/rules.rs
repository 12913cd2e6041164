//! Built-in safety configuration data.
//!
//! Patterns are compiled case-insensitively and tried in order; the first
//! match decides the reason reported for a command.

/// Ordered `(pattern, reason)` hazard rules
pub const DEFAULT_HAZARD_RULES: &[(&str, &str)] = &[
    // rm -rf on /, ~, . or a bare wildcard, long options and quoting included
    (
        r#"\brm\s+((-[a-z]+|--[a-z-]+|--)\s+)*(-[a-z]*r[a-z]*|--recursive)\s+((-[a-z]+|--[a-z-]+|--)\s+)*["']?(/|/\*|~/?|\*|\.)["']?(\s|$)"#,
        "Recursive deletion of the root, home, current directory or a wildcard",
    ),
    (
        r"\brm\s+((-[a-z]+|--[a-z-]+|--)\s+)*(-[a-z]*r[a-z]*|--recursive)\s+.*\*",
        "Recursive deletion using a wildcard pattern",
    ),
    (
        r"\bchmod\s+(-[a-z]+\s+)*0?777\b",
        "Makes files writable and executable by every user",
    ),
    (
        r"\bchmod\s+(-[a-z]*\s+)*-[a-z]*r[a-z]*\s",
        "Recursively changes permissions on a directory tree",
    ),
    (
        r"\bchown\s+(-[a-z]*\s+)*-[a-z]*r[a-z]*\s",
        "Recursively changes ownership of a directory tree",
    ),
    (r"\bmkfs(\.[a-z0-9]+)?\b", "Formats a filesystem and destroys its data"),
    (r"\bdd\s+.*\bof=/dev/", "Writes raw data directly to a device"),
    (
        r">\s*/dev/(sd[a-z]|hd[a-z]|nvme\d|disk\d|mmcblk\d)",
        "Overwrites a block device",
    ),
    (r"\b(fdisk|sfdisk|parted|wipefs)\b", "Modifies the disk partition table"),
    (r"\bshred\b", "Irrecoverably overwrites files"),
    (
        r":\s*\(\s*\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:",
        "Fork bomb: spawns processes until the system hangs",
    ),
    (
        r"\b(curl|wget)\b[^|]*\|\s*(sudo\s+)?(ba|z|da|k)?sh\b",
        "Pipes a downloaded script straight into a shell",
    ),
    (r"\bmv\s+.*\s/dev/null\b", "Moves files into /dev/null, discarding them"),
    (
        r"\b(shutdown|reboot|halt|poweroff)\b",
        "Shuts down or restarts the system",
    ),
    (r"\bkill\s+-9\s+-1\b", "Kills every process the user can signal"),
];

/// Words that suggest destructive intent when no rule matched
pub const DESTRUCTIVE_KEYWORDS: &[&str] = &[
    "format",
    "erase",
    "wipe",
    "destroy",
    "delete all",
    "remove all",
];

/// Reason reported for a keyword-only match
pub const DESTRUCTIVE_INTENT_REASON: &str = "Command appears to have destructive intent";

/// Read-only and informational commands
pub const SAFE_COMMANDS: &[&str] = &[
    "ls", "cd", "pwd", "echo", "cat", "less", "more", "grep", "find", "locate", "which", "man",
    "info", "help", "history", "date", "cal", "uptime", "whoami", "id", "groups", "ps", "top",
    "htop", "df", "du", "free", "netstat", "ss",
];

/// Advice shown for dangerous commands containing a given substring
pub const ADVISORIES: &[(&str, &[&str])] = &[
    (
        "rm -rf",
        &[
            "Consider using 'rm -i' for interactive deletion",
            "Or use the 'trash' command if available for safer deletion",
        ],
    ),
    (
        "chmod 777",
        &[
            "Consider using more restrictive permissions like 755 or 644",
            "Use the principle of least privilege",
        ],
    ),
    (
        "of=/dev/",
        &["Double-check the target device with 'lsblk' before writing to it"],
    ),
    (
        "mkfs",
        &["Confirm the partition with 'lsblk -f' and back up its data first"],
    ),
    (
        "| sh",
        &["Download the script first and read it before running it"],
    ),
    (
        "| bash",
        &["Download the script first and read it before running it"],
    ),
];
