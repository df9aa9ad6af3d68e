//! Pinned versions for the packages the built-in plugins install.
//!
//! Pinning keeps installs reproducible across machines. Bump these together
//! with the built-in plugin definitions.

const PINNED: &[(&str, &str)] = &[
    // Routing
    ("react-router-dom", "^7.1.1"),
    ("vue-router", "^4.5.0"),
    ("@tanstack/react-router", "^1.95.0"),
    ("@solidjs/router", "^0.15.2"),
    // State
    ("zustand", "^5.0.2"),
    ("@reduxjs/toolkit", "^2.5.0"),
    ("react-redux", "^9.2.0"),
    ("jotai", "^2.11.0"),
    ("pinia", "^2.3.0"),
    // HTTP
    ("axios", "^1.7.9"),
    ("@tanstack/react-query", "^5.64.0"),
    ("@tanstack/vue-query", "^5.64.0"),
    ("swr", "^2.3.0"),
    // CSS
    ("tailwindcss", "^4.0.0"),
    ("@tailwindcss/vite", "^4.0.0"),
    ("@tailwindcss/postcss", "^4.0.0"),
    ("unocss", "^65.4.0"),
    ("sass", "^1.83.1"),
    // UI
    ("@mui/material", "^6.3.1"),
    ("@emotion/react", "^11.14.0"),
    ("@emotion/styled", "^11.14.0"),
    ("styled-components", "^6.1.14"),
    ("shadcn", "^2.1.8"),
    ("class-variance-authority", "^0.7.1"),
    ("clsx", "^2.1.1"),
    ("tailwind-merge", "^2.6.0"),
    ("lucide-react", "^0.469.0"),
    ("vuetify", "^3.7.6"),
    // Forms
    ("react-hook-form", "^7.54.2"),
    ("@hookform/resolvers", "^3.10.0"),
    ("formik", "^2.4.6"),
    ("vee-validate", "^4.15.0"),
    // Tooling
    ("eslint", "^9.18.0"),
    ("prettier", "^3.4.2"),
    ("vite-plugin-pwa", "^0.21.1"),
    ("husky", "^9.1.7"),
    // Testing
    ("vitest", "^2.1.8"),
    ("jsdom", "^25.0.1"),
    ("jest", "^29.7.0"),
    ("@testing-library/react", "^16.1.0"),
    ("@testing-library/jest-dom", "^6.6.3"),
    ("@playwright/test", "^1.49.1"),
    // I18n
    ("i18next", "^24.2.1"),
    ("react-i18next", "^15.4.0"),
    ("vue-i18n", "^11.0.1"),
    // Animation
    ("framer-motion", "^11.16.0"),
    ("gsap", "^3.12.5"),
    // Utils
    ("zod", "^3.24.1"),
    ("date-fns", "^4.1.0"),
    ("lodash-es", "^4.17.21"),
];

/// Pinned version spec for `package`, or `latest` when it is not pinned.
pub fn get_version(package: &str) -> &'static str {
    pinned(package).unwrap_or("latest")
}

pub fn pinned(package: &str) -> Option<&'static str> {
    PINNED
        .iter()
        .find(|(name, _)| *name == package)
        .map(|(_, version)| *version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn unknown_packages_get_latest() {
        assert_eq!(get_version("left-pad"), "latest");
        assert_eq!(get_version("zustand"), "^5.0.2");
    }

    #[test]
    fn no_duplicate_pins() {
        let mut seen = HashSet::new();
        for (name, _) in PINNED {
            assert!(seen.insert(name), "{name} pinned twice");
        }
    }
}
