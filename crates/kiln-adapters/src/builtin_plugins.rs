//! The plugins that ship with Kiln.
//!
//! Every entry is a [`DeclarativePlugin`]. Versions come from
//! [`crate::versions`]; cross-references (`requires`, `recommends`,
//! `incompatible_with`) must name other entries in this list, which the
//! tests enforce.

use std::sync::Arc;

use tracing::{debug, warn};

use kiln_core::{
    application::{Catalog, ports::Plugin},
    domain::{
        Bundler, Category, DomainError, Framework, PackageSet, PluginDescriptor,
        PluginDescriptorBuilder, entities::Named,
    },
};

use crate::plugins::{DeclarativePlugin, FileAction};
use crate::versions::get_version;

use Framework::{Angular, NextJs, Nuxt, Preact, React, Solid, Svelte, Vue};

const REACT: &[Framework] = &[React, NextJs];
const VUE: &[Framework] = &[Vue, Nuxt];
const VITE_SPA: &[Framework] = &[React, Vue, Svelte, Solid, Preact];
const ALL: &[Framework] = &Framework::ALL;

/// Build the shipped catalog.
///
/// A definition that fails validation is logged and left out; it never
/// takes the rest of the catalog down with it.
pub fn catalog() -> Catalog {
    Catalog::new(plugins())
}

/// The shipped plugins, in catalog order.
pub fn plugins() -> Vec<Arc<dyn Plugin>> {
    let mut out: Vec<Arc<dyn Plugin>> = Vec::new();
    for entry in definitions() {
        match entry {
            Ok(plugin) => out.push(Arc::new(plugin)),
            Err(e) => warn!(error = %e, "Skipping invalid built-in plugin"),
        }
    }
    debug!(count = out.len(), "Built-in plugins defined");
    out
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn describe(
    name: &str,
    display: &str,
    description: &str,
    category: Category,
    frameworks: &[Framework],
) -> PluginDescriptorBuilder<Named> {
    PluginDescriptor::builder()
        .named(name, display, description)
        .in_category(category)
        .for_frameworks(frameworks.iter().copied())
        .with_version(get_version(name))
}

fn deps(runtime: &[&str], dev: &[&str]) -> PackageSet {
    let set = runtime
        .iter()
        .fold(PackageSet::new(), |set, p| set.dependency(*p, get_version(p)));
    dev.iter()
        .fold(set, |set, p| set.dev_dependency(*p, get_version(p)))
}

fn definitions() -> Vec<Result<DeclarativePlugin, DomainError>> {
    let mut defs = Vec::new();
    routing(&mut defs);
    state(&mut defs);
    http(&mut defs);
    css(&mut defs);
    ui(&mut defs);
    forms(&mut defs);
    tooling(&mut defs);
    testing(&mut defs);
    i18n(&mut defs);
    animation(&mut defs);
    utils(&mut defs);
    defs
}

type Defs = Vec<Result<DeclarativePlugin, DomainError>>;

// ── Routing ───────────────────────────────────────────────────────────────────

fn routing(defs: &mut Defs) {
    defs.push(
        describe(
            "react-router-dom",
            "React Router",
            "Declarative routing for React",
            Category::Routing,
            &[React],
        )
        .build()
        .map(|d| {
            DeclarativePlugin::new(d)
                .packages(deps(&["react-router-dom"], &[]))
                .action(FileAction::create(
                    "{{SRC_DIR}}/router.{{JSX_EXT}}",
                    r#"import { createBrowserRouter } from 'react-router-dom'
import App from './App'

export const router = createBrowserRouter([{ path: '/', element: <App /> }])
"#,
                ))
        }),
    );

    defs.push(
        describe(
            "@tanstack/react-router",
            "TanStack Router",
            "Type-safe routing for React",
            Category::Routing,
            &[React],
        )
        .build()
        .map(|d| DeclarativePlugin::new(d).packages(deps(&["@tanstack/react-router"], &[]))),
    );

    defs.push(
        describe(
            "vue-router",
            "Vue Router",
            "The official router for Vue.js",
            Category::Routing,
            &[Vue],
        )
        .build()
        .map(|d| {
            DeclarativePlugin::new(d)
                .packages(deps(&["vue-router"], &[]))
                .action(FileAction::create(
                    "{{SRC_DIR}}/router/index.{{EXT}}",
                    r#"import { createRouter, createWebHistory } from 'vue-router'

export default createRouter({
  history: createWebHistory(),
  routes: [],
})
"#,
                ))
        }),
    );

    defs.push(
        describe(
            "@solidjs/router",
            "Solid Router",
            "Universal router for SolidJS",
            Category::Routing,
            &[Solid],
        )
        .build()
        .map(|d| DeclarativePlugin::new(d).packages(deps(&["@solidjs/router"], &[]))),
    );
}

// ── State ─────────────────────────────────────────────────────────────────────

fn state(defs: &mut Defs) {
    defs.push(
        describe(
            "zustand",
            "Zustand",
            "Small, fast and scalable state management",
            Category::State,
            REACT,
        )
        .build()
        .map(|d| {
            DeclarativePlugin::new(d)
                .packages(deps(&["zustand"], &[]))
                .action(FileAction::create(
                    "{{SRC_DIR}}/store/index.{{EXT}}",
                    r#"import { create } from 'zustand'

export const useCounter = create((set) => ({
  count: 0,
  increment: () => set((s) => ({ count: s.count + 1 })),
}))
"#,
                ))
        }),
    );

    defs.push(
        describe(
            "@reduxjs/toolkit",
            "Redux Toolkit",
            "The official, batteries-included toolset for Redux",
            Category::State,
            REACT,
        )
        .build()
        .map(|d| {
            DeclarativePlugin::new(d)
                .packages(deps(&["@reduxjs/toolkit", "react-redux"], &[]))
                .action(FileAction::create(
                    "{{SRC_DIR}}/store/index.{{EXT}}",
                    r#"import { configureStore } from '@reduxjs/toolkit'

export const store = configureStore({ reducer: {} })
"#,
                ))
        }),
    );

    defs.push(
        describe(
            "jotai",
            "Jotai",
            "Primitive and flexible atomic state for React",
            Category::State,
            REACT,
        )
        .build()
        .map(|d| DeclarativePlugin::new(d).packages(deps(&["jotai"], &[]))),
    );

    defs.push(
        describe("pinia", "Pinia", "Intuitive store for Vue", Category::State, VUE)
            .build()
            .map(|d| {
                DeclarativePlugin::new(d)
                    .packages(deps(&["pinia"], &[]))
                    .action(FileAction::create(
                        "{{SRC_DIR}}/stores/counter.{{EXT}}",
                        r#"import { defineStore } from 'pinia'

export const useCounterStore = defineStore('counter', {
  state: () => ({ count: 0 }),
})
"#,
                    ))
            }),
    );
}

// ── HTTP ──────────────────────────────────────────────────────────────────────

fn http(defs: &mut Defs) {
    defs.push(
        describe(
            "axios",
            "Axios",
            "Promise based HTTP client",
            Category::Http,
            ALL,
        )
        .build()
        .map(|d| {
            DeclarativePlugin::new(d)
                .packages(deps(&["axios"], &[]))
                .action(FileAction::create(
                    "{{SRC_DIR}}/lib/http.{{EXT}}",
                    r#"import axios from 'axios'

export const http = axios.create({ baseURL: '/api' })
"#,
                ))
        }),
    );

    defs.push(
        describe(
            "@tanstack/react-query",
            "TanStack Query",
            "Server state caching and synchronisation for React",
            Category::Http,
            REACT,
        )
        .recommends(["axios"])
        .build()
        .map(|d| DeclarativePlugin::new(d).packages(deps(&["@tanstack/react-query"], &[]))),
    );

    defs.push(
        describe(
            "@tanstack/vue-query",
            "TanStack Query (Vue)",
            "Server state caching and synchronisation for Vue",
            Category::Http,
            VUE,
        )
        .recommends(["axios"])
        .build()
        .map(|d| DeclarativePlugin::new(d).packages(deps(&["@tanstack/vue-query"], &[]))),
    );

    defs.push(
        describe(
            "swr",
            "SWR",
            "React hooks for data fetching",
            Category::Http,
            REACT,
        )
        .build()
        .map(|d| DeclarativePlugin::new(d).packages(deps(&["swr"], &[]))),
    );
}

// ── CSS ───────────────────────────────────────────────────────────────────────

fn css(defs: &mut Defs) {
    defs.push(
        describe(
            "tailwindcss",
            "Tailwind CSS",
            "Utility-first CSS framework",
            Category::Css,
            ALL,
        )
        .build()
        .map(|d| {
            DeclarativePlugin::new(d)
                .packages(deps(&[], &["tailwindcss", "@tailwindcss/postcss"]))
                .action(FileAction::create(
                    "postcss.config.mjs",
                    "export default {\n  plugins: { '@tailwindcss/postcss': {} },\n}\n",
                ))
                .action(FileAction::append(
                    "{{SRC_DIR}}/index.css",
                    "@import \"tailwindcss\";\n",
                ))
        }),
    );

    defs.push(
        describe(
            "unocss",
            "UnoCSS",
            "Instant on-demand atomic CSS engine",
            Category::Css,
            &[React, Vue, Svelte, Solid, Preact, Nuxt],
        )
        .for_bundlers([Bundler::Vite])
        .build()
        .map(|d| {
            DeclarativePlugin::new(d)
                .packages(deps(&[], &["unocss"]))
                .action(FileAction::create(
                    "uno.config.{{EXT}}",
                    "import { defineConfig } from 'unocss'\n\nexport default defineConfig({})\n",
                ))
        }),
    );

    defs.push(
        describe(
            "sass",
            "Sass",
            "CSS with superpowers",
            Category::Css,
            ALL,
        )
        .build()
        .map(|d| DeclarativePlugin::new(d).packages(deps(&[], &["sass"]))),
    );
}

// ── UI ────────────────────────────────────────────────────────────────────────

fn ui(defs: &mut Defs) {
    defs.push(
        describe(
            "shadcn",
            "shadcn/ui",
            "Copy-paste components built on Radix and Tailwind",
            Category::Ui,
            REACT,
        )
        .requires(["tailwindcss"])
        .build()
        .map(|d| {
            DeclarativePlugin::new(d)
                .packages(deps(
                    &[
                        "class-variance-authority",
                        "clsx",
                        "tailwind-merge",
                        "lucide-react",
                    ],
                    &[],
                ))
                .detected_by(["class-variance-authority"])
                .action(FileAction::create(
                    "{{SRC_DIR}}/lib/utils.{{EXT}}",
                    r#"import { clsx } from 'clsx'
import { twMerge } from 'tailwind-merge'

export function cn(...inputs) {
  return twMerge(clsx(inputs))
}
"#,
                ))
        }),
    );

    defs.push(
        describe(
            "@emotion/react",
            "Emotion",
            "CSS-in-JS with great performance",
            Category::Ui,
            REACT,
        )
        .incompatible_with(["styled-components"])
        .build()
        .map(|d| DeclarativePlugin::new(d).packages(deps(&["@emotion/react", "@emotion/styled"], &[]))),
    );

    defs.push(
        describe(
            "styled-components",
            "styled-components",
            "Visual primitives for the component age",
            Category::Ui,
            REACT,
        )
        .build()
        .map(|d| DeclarativePlugin::new(d).packages(deps(&["styled-components"], &[]))),
    );

    defs.push(
        describe(
            "@mui/material",
            "Material UI",
            "React components implementing Material Design",
            Category::Ui,
            REACT,
        )
        .requires(["@emotion/react"])
        .build()
        .map(|d| DeclarativePlugin::new(d).packages(deps(&["@mui/material"], &[]))),
    );

    defs.push(
        describe(
            "vuetify",
            "Vuetify",
            "Material component framework for Vue",
            Category::Ui,
            VUE,
        )
        .build()
        .map(|d| DeclarativePlugin::new(d).packages(deps(&["vuetify"], &[]))),
    );
}

// ── Forms ─────────────────────────────────────────────────────────────────────

fn forms(defs: &mut Defs) {
    defs.push(
        describe(
            "react-hook-form",
            "React Hook Form",
            "Performant forms with easy validation",
            Category::Forms,
            REACT,
        )
        .incompatible_with(["formik"])
        .recommends(["zod"])
        .build()
        .map(|d| {
            DeclarativePlugin::new(d)
                .packages(deps(&["react-hook-form", "@hookform/resolvers"], &[]))
        }),
    );

    defs.push(
        describe(
            "formik",
            "Formik",
            "Build forms in React without tears",
            Category::Forms,
            REACT,
        )
        .build()
        .map(|d| DeclarativePlugin::new(d).packages(deps(&["formik"], &[]))),
    );

    defs.push(
        describe(
            "vee-validate",
            "VeeValidate",
            "Form validation for Vue",
            Category::Forms,
            VUE,
        )
        .recommends(["zod"])
        .build()
        .map(|d| DeclarativePlugin::new(d).packages(deps(&["vee-validate"], &[]))),
    );
}

// ── Tooling ───────────────────────────────────────────────────────────────────

fn tooling(defs: &mut Defs) {
    defs.push(
        describe("eslint", "ESLint", "Find and fix problems in your code", Category::Tooling, ALL)
            .build()
            .map(|d| {
                DeclarativePlugin::new(d)
                    .packages(deps(&[], &["eslint"]))
                    .action(FileAction::create(
                        "eslint.config.js",
                        "export default [\n  { ignores: ['dist'] },\n]\n",
                    ))
            }),
    );

    defs.push(
        describe("prettier", "Prettier", "Opinionated code formatter", Category::Tooling, ALL)
            .recommends(["eslint"])
            .build()
            .map(|d| {
                DeclarativePlugin::new(d)
                    .packages(deps(&[], &["prettier"]))
                    .action(FileAction::create(
                        ".prettierrc",
                        "{\n  \"singleQuote\": true,\n  \"semi\": false\n}\n",
                    ))
                    .action(FileAction::ensure_line(".prettierignore", "dist"))
            }),
    );

    defs.push(
        describe(
            "vite-plugin-pwa",
            "Vite PWA",
            "Zero-config PWA support for Vite",
            Category::Tooling,
            VITE_SPA,
        )
        .for_bundlers([Bundler::Vite])
        .build()
        .map(|d| {
            DeclarativePlugin::new(d)
                .packages(deps(&[], &["vite-plugin-pwa"]))
                .action(FileAction::insert_after(
                    "vite.config.{{EXT}}",
                    "from 'vite'",
                    "import { VitePWA } from 'vite-plugin-pwa'",
                ))
        }),
    );

    defs.push(
        describe("husky", "Husky", "Git hooks made easy", Category::Tooling, ALL)
            .build()
            .map(|d| {
                DeclarativePlugin::new(d)
                    .packages(deps(&[], &["husky"]))
                    .action(FileAction::create(".husky/pre-commit", "npm test\n"))
            }),
    );
}

// ── Testing ───────────────────────────────────────────────────────────────────

fn testing(defs: &mut Defs) {
    defs.push(
        describe(
            "vitest",
            "Vitest",
            "Vite-native unit test framework",
            Category::Testing,
            &[React, Vue, Svelte, Solid, Preact, NextJs, Nuxt],
        )
        .incompatible_with(["jest"])
        .build()
        .map(|d| {
            DeclarativePlugin::new(d)
                .packages(deps(&[], &["vitest", "jsdom"]))
                .action(FileAction::create(
                    "vitest.config.{{EXT}}",
                    r#"import { defineConfig } from 'vitest/config'

export default defineConfig({
  test: { environment: 'jsdom' },
})
"#,
                ))
        }),
    );

    defs.push(
        describe(
            "jest",
            "Jest",
            "Delightful JavaScript testing",
            Category::Testing,
            &[React, Vue, Angular, NextJs, Preact],
        )
        .build()
        .map(|d| {
            DeclarativePlugin::new(d)
                .packages(deps(&[], &["jest"]))
                .action(FileAction::create(
                    "jest.config.js",
                    "module.exports = { testEnvironment: 'jsdom' }\n",
                ))
        }),
    );

    defs.push(
        describe(
            "@testing-library/react",
            "React Testing Library",
            "Test React components the way users use them",
            Category::Testing,
            REACT,
        )
        .recommends(["vitest"])
        .build()
        .map(|d| {
            DeclarativePlugin::new(d).packages(deps(
                &[],
                &["@testing-library/react", "@testing-library/jest-dom"],
            ))
        }),
    );

    defs.push(
        describe(
            "@playwright/test",
            "Playwright",
            "Reliable end-to-end testing",
            Category::Testing,
            ALL,
        )
        .build()
        .map(|d| {
            DeclarativePlugin::new(d)
                .packages(deps(&[], &["@playwright/test"]))
                .action(FileAction::create(
                    "playwright.config.{{EXT}}",
                    "import { defineConfig } from '@playwright/test'\n\nexport default defineConfig({ testDir: './e2e' })\n",
                ))
                .action(FileAction::ensure_line(".gitignore", "/test-results/"))
        }),
    );
}

// ── I18n / Animation / Utils ──────────────────────────────────────────────────

fn i18n(defs: &mut Defs) {
    defs.push(
        describe(
            "react-i18next",
            "react-i18next",
            "Internationalization for React built on i18next",
            Category::I18n,
            REACT,
        )
        .build()
        .map(|d| {
            DeclarativePlugin::new(d)
                .packages(deps(&["i18next", "react-i18next"], &[]))
                .action(FileAction::create(
                    "{{SRC_DIR}}/i18n.{{EXT}}",
                    r#"import i18n from 'i18next'
import { initReactI18next } from 'react-i18next'

i18n.use(initReactI18next).init({ lng: 'en', resources: {} })

export default i18n
"#,
                ))
        }),
    );

    defs.push(
        describe("vue-i18n", "Vue I18n", "Internationalization for Vue", Category::I18n, VUE)
            .build()
            .map(|d| DeclarativePlugin::new(d).packages(deps(&["vue-i18n"], &[]))),
    );
}

fn animation(defs: &mut Defs) {
    defs.push(
        describe(
            "framer-motion",
            "Framer Motion",
            "Production-ready motion library for React",
            Category::Animation,
            REACT,
        )
        .build()
        .map(|d| DeclarativePlugin::new(d).packages(deps(&["framer-motion"], &[]))),
    );

    defs.push(
        describe("gsap", "GSAP", "Professional-grade animation", Category::Animation, ALL)
            .build()
            .map(|d| DeclarativePlugin::new(d).packages(deps(&["gsap"], &[]))),
    );
}

fn utils(defs: &mut Defs) {
    for (name, display, description) in [
        ("zod", "Zod", "TypeScript-first schema validation"),
        ("date-fns", "date-fns", "Modern date utility library"),
        ("lodash-es", "Lodash", "Utility library as ES modules"),
    ] {
        defs.push(
            describe(name, display, description, Category::Utils, ALL)
                .build()
                .map(|d| DeclarativePlugin::new(d).packages(deps(&[name], &[]))),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::domain::Severity;
    use std::collections::HashSet;

    #[test]
    fn every_definition_is_valid() {
        for entry in definitions() {
            assert!(entry.is_ok(), "{:?}", entry.err());
        }
        let catalog = catalog();
        assert!(catalog.rejected().is_empty());
        assert!(catalog.len() >= 30);
    }

    #[test]
    fn cross_references_resolve() {
        let catalog = catalog();
        assert!(catalog.rules().diagnostics.is_empty());

        let names: HashSet<&str> = catalog.descriptors().map(|d| d.name.as_str()).collect();
        for d in catalog.descriptors() {
            for r in d.requires.iter().chain(&d.recommends).chain(&d.incompatible_with) {
                assert!(names.contains(r.as_str()), "{} references {r}", d.name);
            }
        }
    }

    #[test]
    fn every_category_is_populated() {
        let catalog = catalog();
        for category in Category::ALL {
            assert!(!catalog.by_category(category).is_empty(), "{category} is empty");
        }
    }

    #[test]
    fn shipped_packages_are_pinned() {
        for plugin in plugins() {
            let d = plugin.descriptor();
            assert_ne!(d.version, "latest", "{} has no pinned version", d.name);
        }
    }

    #[test]
    fn state_exclusivity_is_an_error() {
        let catalog = catalog();
        let exclusive = catalog
            .rules()
            .iter()
            .find(|r| r.type_name() == "EXCLUSIVE" && r.reason().contains("state"))
            .expect("state exclusivity rule");
        assert_eq!(exclusive.severity(), Severity::Error);
        assert!(!exclusive.allow_override());
    }
}
