//! Static catalog of export targets.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PreviewError;

/// Supported export targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    /// React with Shadcn components.
    React,
    /// Flutter with Riverpod.
    Flutter,
    /// Vue 3.
    Vue,
    /// SvelteKit.
    Svelte,
    /// `SwiftUI`.
    SwiftUi,
    /// Jetpack Compose.
    JetpackCompose,
    /// React Native.
    ReactNative,
    /// `SolidJS`.
    Solid,
    /// Qwik.
    Qwik,
    /// Astro.
    Astro,
    /// Elm.
    Elm,
}

/// Reference data describing one export target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkDescriptor {
    /// The framework this entry describes.
    #[serde(skip)]
    pub framework: Framework,
    /// Stable identifier used in conversion requests.
    pub value: &'static str,
    /// Display label.
    pub label: &'static str,
    /// Ecosystem tag.
    pub info: &'static str,
    /// Display order, 1 first.
    pub rank: u8,
    /// Guidance passed to the conversion service.
    pub instruction: &'static str,
    /// Scaffolding command.
    pub cli_command: &'static str,
    /// One-line scaffolding summary.
    pub one_line_instruction: &'static str,
}

/// All catalog entries, in declaration order of [`Framework`].
pub static CATALOG: [FrameworkDescriptor; 11] = [
    FrameworkDescriptor {
        framework: Framework::React,
        value: "react",
        label: "React",
        info: "JavaScript",
        rank: 1,
        instruction: "Implement using Shadcn components. Utilize built-in React hooks for state management and side effects.",
        cli_command: "npx create-next-app@latest && npx shadcn-ui@latest init",
        one_line_instruction: "Create a Next.js app with Shadcn UI components.",
    },
    FrameworkDescriptor {
        framework: Framework::Flutter,
        value: "flutter",
        label: "Flutter",
        info: "Dart",
        rank: 2,
        instruction: "Implement state management using Riverpod. Use Flutter Hooks for reusable stateful logic. Consider using go_router for declarative routing.",
        cli_command: "flutter create my_app && flutter pub add flutter_riverpod hooks_riverpod go_router",
        one_line_instruction: "Create a Flutter project with Riverpod, Hooks, and go_router.",
    },
    FrameworkDescriptor {
        framework: Framework::Vue,
        value: "vue",
        label: "Vue.js",
        info: "JavaScript",
        rank: 3,
        instruction: "Use Vue 3 with Composition API and <script setup>. Implement state management with Pinia. Use Vue Router for navigation.",
        cli_command: "npm init vue@latest && npm install pinia vue-router@4",
        one_line_instruction: "Create a Vue 3 project with Pinia and Vue Router.",
    },
    FrameworkDescriptor {
        framework: Framework::Svelte,
        value: "svelte",
        label: "Svelte",
        info: "JavaScript",
        rank: 4,
        instruction: "Use SvelteKit for full-stack development. Implement state management with Svelte stores. Consider using Tailwind CSS for styling.",
        cli_command: "npm create svelte@latest my-app && npm install -D tailwindcss postcss autoprefixer && npx tailwindcss init -p",
        one_line_instruction: "Create a SvelteKit project with Tailwind CSS integration.",
    },
    FrameworkDescriptor {
        framework: Framework::SwiftUi,
        value: "swiftui",
        label: "SwiftUI",
        info: "Swift (iOS)",
        rank: 5,
        instruction: "Use the MVVM architecture pattern. Implement dependency injection with Swift's property wrappers. Consider using Combine for reactive programming.",
        cli_command: "swift package init --type executable && swift package add Combine",
        one_line_instruction: "Initialize a Swift package and add Combine framework.",
    },
    FrameworkDescriptor {
        framework: Framework::JetpackCompose,
        value: "jetpackcompose",
        label: "Jetpack Compose",
        info: "Kotlin (Android)",
        rank: 6,
        instruction: "Use ViewModel and StateFlow for state management. Implement dependency injection with Hilt. Use Coil for image loading.",
        cli_command: "android create project --activity MainActivity --package com.example.myapp && ./gradlew addHiltDependencies addCoilDependencies",
        one_line_instruction: "Create an Android project with Hilt and Coil dependencies.",
    },
    FrameworkDescriptor {
        framework: Framework::ReactNative,
        value: "reactnative",
        label: "React Native",
        info: "JavaScript",
        rank: 7,
        instruction: "Use React Navigation for routing. Implement state management with Redux Toolkit. Consider using React Native Paper for UI components.",
        cli_command: "npx react-native init MyApp --template react-native-template-typescript && npm install @react-navigation/native @reduxjs/toolkit react-native-paper",
        one_line_instruction: "Create a React Native app with React Navigation, Redux Toolkit, and React Native Paper.",
    },
    FrameworkDescriptor {
        framework: Framework::Solid,
        value: "solid",
        label: "SolidJS",
        info: "JavaScript",
        rank: 8,
        instruction: "Use SolidJS stores for state management. Implement routing with Solid Router. Consider using Tailwind CSS for styling.",
        cli_command: "npx degit solidjs/templates/ts my-solid-project && npm install @solidjs/router tailwindcss postcss autoprefixer && npx tailwindcss init -p",
        one_line_instruction: "Create a SolidJS project with Solid Router and Tailwind CSS.",
    },
    FrameworkDescriptor {
        framework: Framework::Qwik,
        value: "qwik",
        label: "Qwik",
        info: "TypeScript",
        rank: 9,
        instruction: "Use Qwik City for full-stack development. Implement state management with Qwik's createContextId. Consider using Tailwind CSS for styling.",
        cli_command: "npm create qwik@latest && npm install -D tailwindcss postcss autoprefixer && npx tailwindcss init -p",
        one_line_instruction: "Create a Qwik project with Tailwind CSS integration.",
    },
    FrameworkDescriptor {
        framework: Framework::Astro,
        value: "astro",
        label: "Astro",
        info: "JavaScript",
        rank: 10,
        instruction: "Use Astro's built-in components and partial hydration. Implement dynamic routes with Astro's file-based routing. Consider using Tailwind CSS for styling.",
        cli_command: "npm create astro@latest -- --template basics && npx astro add tailwind",
        one_line_instruction: "Create an Astro project with Tailwind CSS integration.",
    },
    FrameworkDescriptor {
        framework: Framework::Elm,
        value: "elm",
        label: "Elm",
        info: "Elm",
        rank: 11,
        instruction: "Use elm-ui for layout and styling. Implement HTTP requests with elm/http. Consider using elm-spa for single-page application routing.",
        cli_command: "elm init && elm install mdgriffith/elm-ui elm/http rtfeldman/elm-spa",
        one_line_instruction: "Initialize an Elm project with elm-ui, elm/http, and elm-spa packages.",
    },
];

impl Framework {
    /// Every framework, in rank order.
    pub const ALL: [Framework; 11] = [
        Self::React,
        Self::Flutter,
        Self::Vue,
        Self::Svelte,
        Self::SwiftUi,
        Self::JetpackCompose,
        Self::ReactNative,
        Self::Solid,
        Self::Qwik,
        Self::Astro,
        Self::Elm,
    ];

    /// Catalog entry for this framework.
    #[must_use]
    pub fn descriptor(self) -> &'static FrameworkDescriptor {
        &CATALOG[self as usize]
    }

    /// Stable identifier.
    #[must_use]
    pub fn value(self) -> &'static str {
        self.descriptor().value
    }

    /// Guidance string sent along with the HTML.
    #[must_use]
    pub fn instruction(self) -> &'static str {
        self.descriptor().instruction
    }

    /// File name offered when downloading converted source.
    #[must_use]
    pub fn export_file_name(self) -> String {
        format!("exported_{}.txt", self.value())
    }
}

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.value())
    }
}

impl FromStr for Framework {
    type Err = PreviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CATALOG
            .iter()
            .find(|d| d.value == s)
            .map(|d| d.framework)
            .ok_or_else(|| PreviewError::UnknownFramework(s.to_string()))
    }
}

/// Catalog entries whose label contains `term`, ignoring case, in rank order.
#[must_use]
pub fn search(term: &str) -> Vec<&'static FrameworkDescriptor> {
    let needle = term.to_lowercase();
    let mut hits: Vec<_> = CATALOG
        .iter()
        .filter(|d| d.label.to_lowercase().contains(&needle))
        .collect();
    hits.sort_by_key(|d| d.rank);
    hits
}
